//! mb command - Make a bucket
//!
//! The bucket is created in the region given with the global `--region`
//! flag, or the configured region when it is absent.

use clap::Args;
use stow_core::{ErrorKind, ObjectClient};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Make a bucket
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Name of the bucket to create
    pub bucket: String,

    /// Succeed if the bucket already exists
    #[arg(short = 'p', long)]
    pub ignore_existing: bool,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let outcome = match client.create_bucket(&args.bucket).await {
        Ok(o) => o,
        Err(e) => return fail(formatter, "Failed to create bucket", &e),
    };

    if args.ignore_existing && outcome.error() == Some(ErrorKind::Conflict) {
        formatter.warning(&format!("Bucket '{}' already exists", args.bucket));
        return ExitCode::Success;
    }

    formatter.outcome("Created bucket", &outcome);
    ExitCode::from_outcome(&outcome)
}

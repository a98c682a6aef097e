//! rm command - Remove objects

use clap::Args;
use stow_core::ObjectClient;

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Bucket holding the objects
    pub bucket: String,

    /// Keys to remove
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let spinner = formatter.spinner(format!("Removing {} object(s)", args.keys.len()));
    let result = client.delete_objects(&args.bucket, args.keys).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            formatter.report("rm", &args.bucket, &report);
            ExitCode::from_report(&report)
        }
        Err(e) => fail(formatter, "Failed to remove objects", &e),
    }
}

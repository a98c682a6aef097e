//! rb command - Remove a bucket
//!
//! Deletes every object first; the bucket itself is only deleted when all
//! of them are gone.

use clap::Args;
use stow_core::{BucketDeletion, ObjectClient};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove a bucket and its objects
#[derive(Args, Debug)]
pub struct RbArgs {
    /// Name of the bucket to remove
    pub bucket: String,
}

/// Execute the rb command
pub async fn execute(args: RbArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let spinner = formatter.spinner(format!("Removing bucket {}", args.bucket));
    let result = client.delete_bucket(&args.bucket).await;
    spinner.finish_and_clear();

    let deletion = match result {
        Ok(d) => d,
        Err(e) => return fail(formatter, "Failed to remove bucket", &e),
    };

    if formatter.is_json() {
        formatter.json(&deletion);
        return exit_code(&deletion);
    }

    if deletion.objects.total() > 0 {
        formatter.report("rb", &args.bucket, &deletion.objects);
    }
    match &deletion.outcome {
        Some(outcome) => formatter.outcome("Removed bucket", outcome),
        None => formatter.error(&format!(
            "Bucket '{}' not removed: {} object(s) remain",
            args.bucket,
            deletion.objects.failed.len() + deletion.objects.skipped.len()
        )),
    }

    exit_code(&deletion)
}

fn exit_code(deletion: &BucketDeletion) -> ExitCode {
    if deletion.deleted {
        return ExitCode::Success;
    }
    match &deletion.outcome {
        Some(outcome) => ExitCode::from_outcome(outcome),
        None => ExitCode::from_report(&deletion.objects),
    }
}

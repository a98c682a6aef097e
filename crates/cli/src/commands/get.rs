//! get command - Download objects
//!
//! Each key is written under the target directory, keeping its `/`
//! separated path.

use std::path::PathBuf;

use clap::Args;
use stow_core::{Download, ObjectClient};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Download objects
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Source bucket
    pub bucket: String,

    /// Keys to download
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Directory to write into
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}

/// Execute the get command
pub async fn execute(args: GetArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let downloads = Download::into_dir(&args.dir, args.keys);

    let spinner = formatter.spinner(format!("Downloading {} object(s)", downloads.len()));
    let result = client.get_objects(&args.bucket, downloads).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            formatter.report("get", &args.bucket, &report);
            ExitCode::from_report(&report)
        }
        Err(e) => fail(formatter, "Failed to download", &e),
    }
}

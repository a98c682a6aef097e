//! Command implementations
//!
//! Each command is a thin layer over [`ObjectClient`]: it builds the request,
//! shows a spinner for long calls and hands the outcome to the formatter.

mod get;
mod ls;
mod mb;
mod put;
mod rb;
mod rm;

use clap::Subcommand;
use stow_core::{Error, ObjectClient};

use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List buckets, or the objects in a bucket
    Ls(ls::LsArgs),

    /// Make a bucket
    Mb(mb::MbArgs),

    /// Remove a bucket and every object in it
    Rb(rb::RbArgs),

    /// Upload local files
    Put(put::PutArgs),

    /// Download objects
    Get(get::GetArgs),

    /// Remove objects
    Rm(rm::RmArgs),
}

/// Execute a command
pub async fn execute(command: Commands, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    match command {
        Commands::Ls(args) => ls::execute(args, client, formatter).await,
        Commands::Mb(args) => mb::execute(args, client, formatter).await,
        Commands::Rb(args) => rb::execute(args, client, formatter).await,
        Commands::Put(args) => put::execute(args, client, formatter).await,
        Commands::Get(args) => get::execute(args, client, formatter).await,
        Commands::Rm(args) => rm::execute(args, client, formatter).await,
    }
}

/// Print an error that escaped the client and pick its exit code
fn fail(formatter: &Formatter, context: &str, error: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {error}"));
    ExitCode::from_i32(error.exit_code())
}

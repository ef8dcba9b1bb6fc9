//! `roleprobe` binary.

use std::process::ExitCode;

use clap::Parser;
use roleprobe_cli::{CliArgs, RoleProbeCli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match RoleProbeCli::default().run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

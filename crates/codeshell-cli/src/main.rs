use std::process::ExitCode;

use clap::Parser;
use codeshell_cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match codeshell_cli::run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

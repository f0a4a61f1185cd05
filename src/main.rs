use std::process::ExitCode;

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    if let Err(e) = skywatch_core::init() {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            eprintln!("skywatch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

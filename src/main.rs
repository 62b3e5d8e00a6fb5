// src/main.rs

use std::process::ExitCode;

use clap::Parser;
use sitepipe::cli::CliArgs;
use sitepipe::errors::SitepipeError;
use sitepipe::{logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("sitepipe: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        // The failing tasks already logged their own errors.
        Err(SitepipeError::BuildFailed(failed)) => {
            eprintln!("sitepipe: build failed ({})", failed.join(", "));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("sitepipe: {err}");
            ExitCode::FAILURE
        }
    }
}

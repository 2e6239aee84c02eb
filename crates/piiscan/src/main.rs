use std::process::ExitCode;

use clap::Parser;
use console::style;

use piiscan::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = piiscan::logging::init(&cli.log_file) {
        eprintln!("{} {e:#}", style("error:").red().bold());
        return ExitCode::FAILURE;
    }

    match piiscan::cli::scan::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "scan aborted");
            eprintln!("{} {e}", style("error:").red().bold());
            exit_code(&e)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    let usage = err
        .downcast_ref::<piiscan_core::Error>()
        .is_some_and(piiscan_core::Error::is_usage);

    if usage {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

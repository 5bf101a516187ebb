use std::process::ExitCode;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;
use xeops_scan::function::commands::run;
use xeops_scan::function::{Command, ScannerError};

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Parse arguments
    let command = Command::from_args();
    init_logging(command.api().debug);

    // 2. Run the command
    match run(command).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let Some(details) = err
                .downcast_ref::<ScannerError>()
                .and_then(|e| e.details.as_ref())
            {
                if let Ok(pretty) = serde_json::to_string_pretty(details) {
                    eprintln!("{}", pretty);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

//! Worker entry point: parses the command rendered by the scheduler,
//! assembles the pipeline for one surface and drives it to completion.

use std::process::ExitCode;

use flatsweep::{render, Registry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let tokens: Vec<String> = std::env::args().skip(1).collect();
    let spec = match Registry::builtin().parse(&tokens) {
        Ok(spec) => spec,
        Err(error) => {
            tracing::error!(
                %error,
                label = error.as_label(),
                command = %render(&tokens),
                "cannot parse the worker command"
            );
            return ExitCode::from(2);
        }
    };

    match flatsweep::worker::run(spec).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, label = error.as_label(), "worker failed");
            ExitCode::FAILURE
        }
    }
}

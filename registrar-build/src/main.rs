//! REGISTRAR binary entry point.

use clap::Parser;
use registrar_build::{init_logging, BuildError, BuildResult, Cli, Registrar};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> BuildResult<()> {
    init_logging(&cli.log_level, cli.json_logs)?;
    let summary_path = cli.summary.clone();

    let registrar = Registrar::new(cli.into_config()?)?;
    tracing::info!(
        inputs = registrar.config().inputs.len(),
        classpath = registrar.config().classpath.len(),
        bootpath = registrar.config().bootpath.len(),
        "Starting registrar"
    );
    let summary = registrar.run()?;

    if let Some(path) = summary_path {
        let summary_error = |reason: String| BuildError::Summary {
            path: path.display().to_string(),
            reason,
        };
        let json = summary.to_json().map_err(|e| summary_error(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| summary_error(e.to_string()))?;
    }
    Ok(())
}

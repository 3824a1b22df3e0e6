use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use sprig::{GenericValue, Pipeline, PipelineConfig, PipelineError, programs};

fn run(config: PipelineConfig) -> anyhow::Result<GenericValue> {
    let entry = config.entry_point.clone();
    let report = Pipeline::new(config)
        .run_program(programs::hello_world)
        .with_context(|| format!("running @{entry}"))?;
    Ok(report.result)
}

/// Exit code for a failed run: the pipeline stage's code, or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(PipelineConfig::default()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

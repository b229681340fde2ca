//! Appraise CLI entry point

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use appraise::cli::{Cli, OutputFormat, ReportView};
use appraise::{
    executive_view, render_text, run_analysis, technical_view, BackendRegistry, EngineError,
    Project, QualityThresholds, RunFailureReason, RunOptions, RunStatus,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> appraise::Result<String> {
    // 1. Thresholds: defaults, or a flat TOML file
    let thresholds = match &cli.config {
        Some(path) => QualityThresholds::from_toml_file(path)?,
        None => QualityThresholds::default(),
    };

    // 2. Build the immutable project description
    let project = Project::new(&cli.path, thresholds)?
        .with_include(cli.include.clone())
        .with_exclude(cli.exclude.clone());

    // 3. Resolve enabled backends: explicit list, or everything registered
    let backend_names = if cli.backends.is_empty() {
        BackendRegistry::with_defaults().names()
    } else {
        cli.backends.clone()
    };

    // 4. Run the analysis
    let options = RunOptions {
        backend_timeout: Duration::from_secs(cli.timeout_secs),
        max_concurrent_backends: cli.max_parallel,
    };
    let run = run_analysis(project, &backend_names, options)?;

    // 5. A failed run surfaces its specific reason through the exit code
    if let RunStatus::Failed { reason } = &run.status {
        return Err(match reason {
            RunFailureReason::Cancelled { message } => EngineError::Cancelled {
                reason: message.clone(),
            },
            other => EngineError::RunFailed {
                reason: other.to_string(),
            },
        });
    }

    // 6. Assemble the requested view
    let view = match cli.view {
        ReportView::Executive => executive_view(&run, cli.top)?,
        ReportView::Technical => technical_view(&run)?,
    };

    // 7. Print in the requested format
    let output = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&view)
            .map_err(|e| EngineError::validation(format!("serialization failed: {e}")))?,
        OutputFormat::Text => match cli.view {
            ReportView::Executive => render_text(&view),
            ReportView::Technical => serde_json::to_string_pretty(&view)
                .map_err(|e| EngineError::validation(format!("serialization failed: {e}")))?,
        },
    };

    Ok(output)
}

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use logbeam::config::PipelineConfig;
use logbeam::diagnostics::init_logging;
use logbeam::orchestrator::CancellationToken;
use logbeam::parse::ParseContext;
use logbeam::pipelines::{PipelineKind, run_pipeline};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "logbeam", version, about = "Batch parsing and aggregation of web-traffic logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse click-stream exports and build sorted visitor paths
    Clickstream(PipelineArgs),

    /// Count browser, OS and referer combinations in access logs
    ClientStats(PipelineArgs),

    /// Render binary visit records as text
    VisitToText(PipelineArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Input file, directory or glob pattern
    input: PathBuf,

    /// Output directory; each stage writes a subdirectory
    output: PathBuf,

    /// Print a status report on every poll
    #[arg(long)]
    status: bool,

    /// Keep intermediate stage outputs
    #[arg(long)]
    nocleanup: bool,

    /// JSON pipeline config file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Accept the single-dash spellings `-status` and `-nocleanup`.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-status" => "--status".to_string(),
            "-nocleanup" => "--nocleanup".to_string(),
            _ => arg,
        })
        .collect()
}

fn run(kind: PipelineKind, args: &PipelineArgs) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.status {
        config.report_progress = true;
    }
    if args.nocleanup {
        config.cleanup = false;
    }

    let run = run_pipeline(
        kind,
        &args.input,
        &args.output,
        &config,
        ParseContext::default(),
        &CancellationToken::new(),
    )?;
    for (name, state) in &run.result.stages {
        tracing::info!(stage = %name, state = ?state, "final stage state");
    }
    for path in &run.cleaned {
        tracing::info!(path = %path.display(), "removed intermediate output");
    }
    Ok(run.result.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    init_logging();

    let (kind, args) = match &cli.command {
        Command::Clickstream(args) => (PipelineKind::ClickStream, args),
        Command::ClientStats(args) => (PipelineKind::ClientStats, args),
        Command::VisitToText(args) => (PipelineKind::VisitToText, args),
    };

    match run(kind, args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("logbeam error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

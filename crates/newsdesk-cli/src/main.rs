use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use newsdesk_agents::{Orchestrator, RunOptions};
use newsdesk_core::{ConfigLoader, RunResult, TelemetryOptions, TraceSummary, init_telemetry};
use tokio::runtime::Runtime;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "newsdesk",
    version,
    about = "Multi-agent news analysis pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research, analyze and report on a news topic.
    Run(RunArgs),
    /// Print the effective configuration as loaded from file and defaults.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Topic to analyze.
    #[arg(long)]
    topic: String,

    /// Configuration file (defaults to `NEWSDESK_CONFIG`, then `newsdesk.toml`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the result.
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Also print the agent trace.
    #[arg(long, value_enum)]
    trace: Option<TraceFormat>,

    /// Run the fact checker before the report.
    #[arg(long)]
    fact_check: bool,

    /// Maximum number of articles to collect.
    #[arg(long)]
    max_articles: Option<usize>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TraceFormat {
    Markdown,
    Mermaid,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Run(args) => run_command(args).await?,
            Command::Config(args) => config_command(args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

async fn run_command(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load(args.config)?;
    init_telemetry(TelemetryOptions {
        default_level: config.logging.level.clone(),
        ..TelemetryOptions::default()
    })?;

    info!(topic = %args.topic, "starting news analysis run");

    let mut options = RunOptions::default();
    if args.fact_check {
        options = options.with_fact_check(true);
    }
    if let Some(max_articles) = args.max_articles {
        options = options.with_max_articles(max_articles);
    }

    let orchestrator = Orchestrator::from_config(&config);
    let result = orchestrator.run_with_options(&args.topic, options).await;

    print_result(&result, args.format)?;
    if let Some(format) = args.trace {
        let summary = TraceSummary::from_messages(&result.messages);
        match format {
            TraceFormat::Markdown => println!("\n{}", summary.render_markdown()),
            TraceFormat::Mermaid => println!("\n{}", summary.render_mermaid()),
        }
    }

    if !result.is_success() {
        warn!(status = %result.status, "run did not complete");
        bail!("run finished with status {}", result.status);
    }
    Ok(())
}

fn config_command(args: ConfigArgs) -> Result<()> {
    let config = ConfigLoader::load(args.config)?;
    println!("{config:#?}");
    Ok(())
}

fn print_result(result: &RunResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Markdown => println!("{}", result.final_report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

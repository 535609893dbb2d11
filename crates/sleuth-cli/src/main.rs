mod arch_doc;
mod reporter;
mod run;

use clap::Parser;
use sleuth_core::config::{SleuthConfig, AGENT_BIN_ENV, MODEL_ENV};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "sleuth",
    about = "Feed bug reports to an AI coding-assistant session and persist structured findings",
    version
)]
struct Cli {
    /// Path to the bug JSON work file
    bug_file: PathBuf,

    /// Assistant model id
    #[arg(long, env = MODEL_ENV)]
    model: Option<String>,

    /// Path to the assistant CLI binary
    #[arg(long, env = AGENT_BIN_ENV)]
    agent_bin: Option<PathBuf>,

    /// Per-bug session timeout in minutes
    #[arg(long, default_value = "15")]
    timeout_mins: u64,

    /// Suppress streamed reasoning output
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = SleuthConfig::default();
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(bin) = cli.agent_bin {
        config.agent_bin = bin;
    }
    config.session_timeout = Duration::from_secs(cli.timeout_mins * 60);
    config.show_reasoning = !cli.quiet;

    if let Err(e) = run::process_file(&cli.bug_file, &config).await {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

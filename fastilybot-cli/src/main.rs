mod cli;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::handlers;
use fastilybot_core::models::{determine_tasks, Configuration, ReportTask};
use fastilybot_core::tasks::Selection;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fastilybot")]
#[command(version)]
#[command(about = "FastilyBot: maintenance bot and database reports for the English Wikipedia")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}\n"
)]
struct Cli {
    /// The username to use
    #[arg(short = 'u', value_name = "username", default_value = "FastilyBot")]
    username: String,

    /// Comma delimited IDs of bot tasks to run
    ///
    /// Example: fastilybot -b 1,2,4
    #[arg(short = 'b', value_name = "bot_id", value_delimiter = ',')]
    bots: Vec<u32>,

    /// Comma delimited IDs of report tasks to run
    #[arg(short = 'r', value_name = "report_id", value_delimiter = ',')]
    reports: Vec<u32>,

    /// Run every report task
    #[arg(long = "all-reports")]
    all_reports: bool,

    /// Disable colors in log output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Delete all cached files created by fastilybot and exit
    #[arg(long = "purge-cache")]
    purge_cache: bool,

    /// Save a password to the credential store and exit
    #[arg(long)]
    wgen: bool,

    /// Configuration file (default: ~/.config/fastilybot/config.toml)
    #[arg(long, value_name = "path")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Configuration::default_config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get default config path: {}", e))?,
    };
    let config = handlers::load_config(&config_path)?;
    handlers::init_logging(&config, !cli.no_color)?;
    tracing::debug!(config = %config_path.display(), "Loaded configuration");

    if cli.purge_cache {
        return handlers::handle_purge_cache(&config);
    }

    if cli.wgen {
        return handlers::handle_wgen(&config, &cli.username);
    }

    let selection = Selection {
        bots: cli.bots,
        reports: determine_tasks(&cli.reports, cli.all_reports, ReportTask::MAX_ID),
    };
    if selection.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    handlers::handle_run(
        &config,
        handlers::RunOptions {
            username: cli.username,
            selection,
        },
    )
    .await
}

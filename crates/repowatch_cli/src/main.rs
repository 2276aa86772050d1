//! repowatch CLI - watch a GitHub organization for stars, forks and issues.

mod commands;
mod config;
mod shutdown;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;
use crate::commands::watch::TargetArgs;

#[derive(Parser)]
#[command(name = "repowatch")]
#[command(version)]
#[command(about = "Watch a GitHub organization for new stargazers, forks and issues")]
#[command(after_long_help = r#"EXAMPLES
    Watch two repositories every ten minutes:
        $ repowatch watch -o rust-lang -r cargo -r rustup --schedule "@every 10m"

    Watch a whole organization at the top of every hour:
        $ repowatch watch -o tokio-rs --schedule "0 * * * *"

    Fetch once and print every repository as JSON:
        $ repowatch once -o tokio-rs --output json

CONFIGURATION
    repowatch reads configuration from:
      1. ~/.config/repowatch/config.toml (or $XDG_CONFIG_HOME/repowatch/config.toml)
      2. ./repowatch.toml
      3. Environment variables (REPOWATCH_* prefix, e.g., REPOWATCH_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                   GitHub token (same as --token)
    REPOWATCH_GITHUB_TOKEN         GitHub token
    REPOWATCH_WATCH_ORGANIZATION   Organization to watch
    REPOWATCH_WATCH_REPOSITORIES   Comma-separated repositories
    REPOWATCH_WATCH_SCHEDULE       Schedule expression (default: @every 30m)
    RUST_LOG                       Log filter (default: repowatch=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch on a schedule and print a report after every cycle
    Watch {
        #[command(flatten)]
        target: TargetArgs,

        /// Schedule: "@every 10m", a 5-field cron line, or a cron macro
        #[arg(short, long)]
        schedule: Option<String>,
    },
    /// Fetch once and print the current state of every repository
    Once {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Show current rate limit status
    Limits {
        /// GitHub token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("repowatch=info,repowatch_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { target, schedule } => {
            commands::watch::handle_watch(&target, schedule, &config).await?;
        }
        Commands::Once { target } => {
            commands::watch::handle_once(&target, &config).await?;
        }
        Commands::Limits {
            token,
            api_url,
            output,
        } => {
            commands::limits::handle_limits(token, api_url, output, &config).await?;
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
    }

    Ok(())
}

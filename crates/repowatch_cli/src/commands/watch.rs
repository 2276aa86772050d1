use repowatch::{CycleOutcome, Watcher, format_duration};

use super::limits::OutputFormat;
use super::report::print_report;
use crate::config::Config;
use crate::shutdown::shutdown_signal;

/// What to watch and how to reach GitHub. Unset flags fall back to config.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct TargetArgs {
    /// Organization to watch
    #[arg(short = 'o', long)]
    pub organization: Option<String>,

    /// Repository to watch (repeatable; default is the whole organization)
    #[arg(short = 'r', long = "repo", value_name = "NAME")]
    pub repositories: Vec<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Maximum repositories fetched at once
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Upper bound on pages per listing
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Pace requests client-side
    #[arg(long)]
    pub requests_per_second: Option<u32>,

    /// Output format for change reports
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Merge flags over config into a watcher.
pub(crate) fn build_watcher(args: &TargetArgs, config: &Config) -> Watcher {
    let mut watcher = Watcher::new();

    if let Some(org) = args
        .organization
        .clone()
        .or_else(|| config.watch.organization.clone())
    {
        watcher.set_organization(org);
    }
    if args.repositories.is_empty() {
        watcher.add_repositories(config.watch.repositories.iter().cloned());
    } else {
        watcher.add_repositories(args.repositories.iter().cloned());
    }
    if let Some(token) = args
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| config.github_token())
    {
        watcher.set_github_token(token);
    }

    watcher
        .set_api_url(
            args.api_url
                .clone()
                .unwrap_or_else(|| config.github.api_url.clone()),
        )
        .set_concurrency(args.concurrency.unwrap_or(config.watch.concurrency))
        .set_max_pages(args.max_pages.unwrap_or(config.watch.max_pages))
        .set_requests_per_second(args.requests_per_second.or(config.github.requests_per_second))
        .set_request_timeout(config.watch.request_timeout());

    watcher
}

/// Handle the watch command: run on a schedule until Ctrl+C.
pub(crate) async fn handle_watch(
    args: &TargetArgs,
    schedule: Option<String>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let expr = schedule.unwrap_or_else(|| config.watch.schedule.clone());
    let output = args.output;

    let mut watcher = build_watcher(args, config);
    watcher.on_report(move |report| {
        if let Err(e) = print_report(report, output) {
            tracing::error!("Failed to print report: {}", e);
        }
    });

    let job = watcher.schedule(&expr)?;
    tracing::info!(
        "Watching {} on \"{}\"",
        watcher.organization(),
        job.schedule()
    );
    job.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Handle the once command: a single cycle against an empty store.
pub(crate) async fn handle_once(
    args: &TargetArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_watcher(args, config).engine()?;

    match engine.run_cycle().await? {
        CycleOutcome::Completed { report } => {
            print_report(&report, args.output)?;
            Ok(())
        }
        CycleOutcome::Skipped { reset_at } => {
            let wait = format_duration(reset_at.signed_duration_since(chrono::Utc::now()));
            Err(format!("Rate limit exhausted, resets in {} at {}", wait, reset_at).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GitHubConfig, WatchConfig};

    fn config() -> Config {
        Config {
            github: GitHubConfig {
                token: Some("from-config".to_string()),
                api_url: "https://ghe.example/api/v3".to_string(),
                requests_per_second: Some(5),
            },
            watch: WatchConfig {
                organization: Some("config-org".to_string()),
                repositories: vec!["alpha".to_string(), "beta".to_string()],
                ..WatchConfig::default()
            },
        }
    }

    #[test]
    fn config_fills_unset_flags() {
        let watcher = build_watcher(&TargetArgs::default(), &config());
        assert_eq!(watcher.organization(), "config-org");
        assert_eq!(watcher.repositories(), ["alpha", "beta"]);
    }

    #[test]
    fn flags_override_config() {
        let args = TargetArgs {
            organization: Some("flag-org".to_string()),
            repositories: vec!["gamma".to_string()],
            ..TargetArgs::default()
        };
        let watcher = build_watcher(&args, &config());
        assert_eq!(watcher.organization(), "flag-org");
        assert_eq!(watcher.repositories(), ["gamma"]);
    }

    #[test]
    fn missing_organization_fails_before_any_request() {
        let watcher = build_watcher(&TargetArgs::default(), &Config::default());
        assert!(matches!(
            watcher.schedule("@every 1m"),
            Err(repowatch::WatchError::MissingOrganization)
        ));
    }

    #[test]
    fn bad_schedule_is_rejected() {
        let watcher = build_watcher(&TargetArgs::default(), &config());
        assert!(matches!(
            watcher.schedule("every now and then"),
            Err(repowatch::WatchError::InvalidSchedule { .. })
        ));
    }
}

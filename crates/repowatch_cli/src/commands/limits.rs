use std::sync::Arc;

use clap::ValueEnum;
use repowatch::github::{GitHubClient, GitHubRateLimits, RateLimitResource};
use repowatch::http::reqwest_transport::ReqwestTransport;
use repowatch::{CachingTransport, format_duration};

use crate::config::Config;

/// Output format for limits and reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Handle the limits command.
pub(crate) async fn handle_limits(
    token: Option<String>,
    api_url: Option<String>,
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let http = ReqwestTransport::with_timeout(config.watch.request_timeout())?;
    let transport = CachingTransport::with_memory_cache(http)
        .with_token(token.or_else(|| config.github_token()).unwrap_or_default());
    let api_url = api_url.unwrap_or_else(|| config.github.api_url.clone());

    let client = GitHubClient::new_with_transport(&api_url, Arc::new(transport), None);
    let rate_limits = client.get_rate_limit().await?;
    RateLimitDisplay::print_many(rate_limits_to_display(&rate_limits.resources), output)?;
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_resource(name: &str, resource: &RateLimitResource) -> Self {
        let usage_percent = if resource.limit > 0 {
            (resource.used as f64 / resource.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_at = resource.reset_at();
        let reset_duration = reset_at.signed_duration_since(chrono::Utc::now());
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: resource.limit.to_string(),
            used: resource.used.to_string(),
            remaining: resource.remaining.to_string(),
            usage_percent: format!("{:.1}%", usage_percent),
            reset_at: reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }

    pub(crate) fn print_many(
        mut items: Vec<Self>,
        format: OutputFormat,
    ) -> Result<(), serde_json::Error> {
        // Sort by resource name for consistent output
        items.sort_by(|a, b| a.resource.cmp(&b.resource));

        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        }
        Ok(())
    }
}

/// Build display rows for every resource GitHub reported.
pub(crate) fn rate_limits_to_display(limits: &GitHubRateLimits) -> Vec<RateLimitDisplay> {
    let mut items = vec![RateLimitDisplay::from_resource("core", &limits.core)];
    if let Some(ref r) = limits.search {
        items.push(RateLimitDisplay::from_resource("search", r));
    }
    if let Some(ref r) = limits.graphql {
        items.push(RateLimitDisplay::from_resource("graphql", r));
    }
    items
}

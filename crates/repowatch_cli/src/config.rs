//! Configuration file support for repowatch.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOWATCH_`, e.g., `REPOWATCH_GITHUB_TOKEN`)
//! 3. Local config file (./repowatch.toml)
//! 4. XDG config file (~/.config/repowatch/config.toml)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use REPOWATCH_GITHUB_TOKEN env var
//! api_url = "https://api.github.com"
//! requests_per_second = 10  # optional client-side pacing
//!
//! [watch]
//! organization = "rust-lang"
//! repositories = []  # empty = whole organization
//! schedule = "@every 30m"
//! concurrency = 4
//! max_pages = 100
//! request_timeout_secs = 30
//! ```
//!
//! Environment variables split on `_`, so only single-word keys can be set
//! that way (`REPOWATCH_WATCH_ORGANIZATION`, `REPOWATCH_WATCH_SCHEDULE`,
//! `REPOWATCH_WATCH_REPOSITORIES=a,b`). Multi-word keys go in a file or a flag.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use repowatch::github::{DEFAULT_MAX_PAGES, GITHUB_API_URL};
use repowatch::sync::DEFAULT_CONCURRENCY;
use serde::Deserialize;

/// Default schedule when none is configured.
pub const DEFAULT_SCHEDULE: &str = "@every 30m";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// What to watch and how often.
    pub watch: WatchConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via REPOWATCH_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// API base URL.
    pub api_url: String,
    /// Client-side request pacing. Unset disables pacing.
    pub requests_per_second: Option<u32>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GITHUB_API_URL.to_string(),
            requests_per_second: None,
        }
    }
}

/// Watch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Organization to watch.
    pub organization: Option<String>,
    /// Repositories to watch; empty means the whole organization.
    pub repositories: Vec<String>,
    /// Schedule expression.
    pub schedule: String,
    /// Maximum repositories fetched at once.
    pub concurrency: usize,
    /// Upper bound on pages per paginated listing.
    pub max_pages: u32,
    /// Timeout for a single API request.
    pub request_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            organization: None,
            repositories: Vec::new(),
            schedule: DEFAULT_SCHEDULE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout_secs: 30,
        }
    }
}

impl WatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/repowatch/config.toml)
    /// 3. Local config file (./repowatch.toml)
    /// 4. Environment variables with REPOWATCH_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        // Add XDG config file if it exists
        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        // Add local config file (higher priority than XDG)
        let local_config = PathBuf::from("repowatch.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./repowatch.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., REPOWATCH_GITHUB_TOKEN -> github.token
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("REPOWATCH")
            .separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("watch.repositories")
    }

    /// Get the GitHub token, ignoring blank values.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repowatch").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

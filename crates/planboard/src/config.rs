//! Settings loaded from environment variables and command-line overrides.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_API_URL: &str = "PLANBOARD_API_URL";
pub const ENV_PLANS_FILE: &str = "PLANBOARD_PLANS_FILE";
pub const ENV_ADMIN_URL: &str = "PLANBOARD_ADMIN_URL";
pub const ENV_TIMEOUT_SECS: &str = "PLANBOARD_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where plans come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSettings {
    /// Base URL of the plan API, e.g. `https://intranet.example.com`
    Api { base_url: String, timeout: Duration },
    /// JSON file shaped like the list endpoint
    File(PathBuf),
}

enum SourceChoice {
    File(PathBuf),
    Api(String),
}

/// Values given on the command line, which take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub plans_file: Option<PathBuf>,
    pub admin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source: SourceSettings,

    /// Prefix for admin change-page links; empty means same origin
    pub admin_base: String,
}

impl Settings {
    /// Load settings from the environment, applying `overrides` on top.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let timeout = match non_empty(env(ENV_TIMEOUT_SECS)) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_TIMEOUT_SECS,
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT,
        };

        let source = match (overrides.plans_file, non_empty(overrides.api_url)) {
            (Some(path), _) => Some(SourceChoice::File(path)),
            (None, Some(url)) => Some(SourceChoice::Api(url)),
            (None, None) => non_empty(env(ENV_PLANS_FILE))
                .map(|p| SourceChoice::File(PathBuf::from(p)))
                .or_else(|| non_empty(env(ENV_API_URL)).map(SourceChoice::Api)),
        };

        let source = match source.ok_or(ConfigError::MissingSource)? {
            SourceChoice::File(path) => SourceSettings::File(path),
            SourceChoice::Api(url) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_API_URL,
                        value: url,
                    });
                }
                SourceSettings::Api {
                    base_url: url.trim_end_matches('/').to_string(),
                    timeout,
                }
            }
        };

        let admin_base = non_empty(overrides.admin_url)
            .or_else(|| non_empty(env(ENV_ADMIN_URL)))
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_default();

        Ok(Self { source, admin_base })
    }
}

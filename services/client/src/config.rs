//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::Level;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Backend features that may not exist server-side yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Preferences,
    Evaluation,
    EvaluationMetrics,
    AdminStores,
    AdminMetrics,
    AdminUsers,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Preferences,
        Feature::Evaluation,
        Feature::EvaluationMetrics,
        Feature::AdminStores,
        Feature::AdminMetrics,
        Feature::AdminUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Preferences => "preferences",
            Feature::Evaluation => "evaluation",
            Feature::EvaluationMetrics => "evaluation-metrics",
            Feature::AdminStores => "admin-stores",
            Feature::AdminMetrics => "admin-metrics",
            Feature::AdminUsers => "admin-users",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == value.trim())
    }
}

/// Which backend endpoints are known to exist. A feature marked unavailable
/// answers with its placeholder without sending a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointAvailability {
    unavailable: HashSet<Feature>,
}

impl EndpointAvailability {
    pub fn all_available() -> Self {
        Self::default()
    }

    pub fn without(mut self, feature: Feature) -> Self {
        self.unavailable.insert(feature);
        self
    }

    pub fn is_available(&self, feature: Feature) -> bool {
        !self.unavailable.contains(&feature)
    }

    /// Parses a comma separated list of unavailable features.
    pub fn parse_unavailable(list: &str) -> Result<Self, String> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .try_fold(Self::default(), |acc, item| {
                Feature::parse(item)
                    .map(|feature| acc.without(feature))
                    .ok_or_else(|| format!("'{}' is not a known feature", item))
            })
    }
}

/// How a 401 on an authenticated request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Refresh the access token and replay the request once.
    Enabled,
    /// Surface the 401 as-is, leaving the stored session untouched.
    Disabled,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: Url,
    pub log_level: Level,
    pub state_dir: PathBuf,
    pub refresh_policy: RefreshPolicy,
    pub availability: EndpointAvailability,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Backend address ---
        let base_url_str =
            lookup("STUDYSEARCH_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base_url_str).map_err(|e| {
            ConfigError::InvalidValue("STUDYSEARCH_BASE_URL".to_string(), e)
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Local state ---
        let state_dir = lookup("STUDYSEARCH_STATE_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("studysearch")))
            .unwrap_or_else(|| PathBuf::from("./.studysearch"));

        // --- Backend capabilities ---
        let refresh_policy = match lookup("STUDYSEARCH_TOKEN_REFRESH") {
            None => RefreshPolicy::Enabled,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => RefreshPolicy::Enabled,
                "0" | "false" | "no" | "off" => RefreshPolicy::Disabled,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "STUDYSEARCH_TOKEN_REFRESH".to_string(),
                        format!("'{}' is not a boolean", value),
                    ))
                }
            },
        };

        let availability = match lookup("STUDYSEARCH_UNAVAILABLE_ENDPOINTS") {
            None => EndpointAvailability::all_available(),
            Some(list) => EndpointAvailability::parse_unavailable(&list).map_err(|e| {
                ConfigError::InvalidValue("STUDYSEARCH_UNAVAILABLE_ENDPOINTS".to_string(), e)
            })?,
        };

        Ok(Self {
            base_url,
            log_level,
            state_dir,
            refresh_policy,
            availability,
        })
    }
}

/// Relative endpoint paths only join correctly onto a base ending in `/`.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("'{}' cannot be used as a base address", raw));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.refresh_policy, RefreshPolicy::Enabled);
        assert!(Feature::ALL
            .iter()
            .all(|f| config.availability.is_available(*f)));
    }

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let config = config_from(&[("STUDYSEARCH_BASE_URL", "https://study.example/api")]).unwrap();
        assert_eq!(config.base_url.as_str(), "https://study.example/api/");
        assert_eq!(
            config.base_url.join("user/login/").unwrap().as_str(),
            "https://study.example/api/user/login/"
        );
    }

    #[test]
    fn unavailable_endpoints_are_parsed() {
        let config = config_from(&[(
            "STUDYSEARCH_UNAVAILABLE_ENDPOINTS",
            "evaluation, admin-users",
        )])
        .unwrap();
        assert!(!config.availability.is_available(Feature::Evaluation));
        assert!(!config.availability.is_available(Feature::AdminUsers));
        assert!(config.availability.is_available(Feature::Preferences));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("STUDYSEARCH_UNAVAILABLE_ENDPOINTS", "telemetry")]),
            Err(ConfigError::InvalidValue(..))
        ));
        assert!(matches!(
            config_from(&[("STUDYSEARCH_TOKEN_REFRESH", "maybe")]),
            Err(ConfigError::InvalidValue(..))
        ));
        assert!(matches!(
            config_from(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidValue(..))
        ));
    }

    #[test]
    fn refresh_can_be_switched_off() {
        let config = config_from(&[("STUDYSEARCH_TOKEN_REFRESH", "false")]).unwrap();
        assert_eq!(config.refresh_policy, RefreshPolicy::Disabled);
    }
}

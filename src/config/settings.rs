//! Application configuration loading from config.toml
//!
//! The file is optional: every section has defaults so the service can start
//! with only a `DATABASE_URL` in the environment. Absence types listed under
//! `[[absence_types]]` are seeded for their tenant at startup.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Event type emitted by the signing service when every recipient has signed.
pub const SIGNING_COMPLETED_EVENT: &str = "signing.request.completed";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Record store URL; `DATABASE_URL` takes precedence
    #[serde(default)]
    pub database_url: Option<String>,
    /// Event feed subscription settings
    #[serde(default)]
    pub events: EventsConfig,
    /// Absence types to create when missing
    #[serde(default)]
    pub absence_types: Vec<AbsenceTypeSeed>,
}

/// Event feed subscription settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EventsConfig {
    /// Whether the listener runs at all
    pub enabled: bool,
    /// Channel prefix; channels are `<prefix>.<event-type>`
    pub topic_prefix: String,
    /// Event types to subscribe to
    pub subscribe_events: Vec<String>,
    /// Upper bound on how long a stop waits for the in-flight message
    pub shutdown_timeout_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic_prefix: "paperless".to_string(),
            subscribe_events: vec![SIGNING_COMPLETED_EVENT.to_string()],
            shutdown_timeout_secs: 5,
        }
    }
}

impl EventsConfig {
    /// Effective prefix, never empty.
    #[must_use]
    pub fn prefix(&self) -> &str {
        if self.topic_prefix.is_empty() {
            "paperless"
        } else {
            &self.topic_prefix
        }
    }

    /// Fully qualified channel names to subscribe to.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.subscribe_events
            .iter()
            .map(|event| format!("{}.{event}", self.prefix()))
            .collect()
    }

    /// Bounded shutdown wait.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Configuration for a single seeded absence type
#[derive(Debug, Deserialize, Clone)]
pub struct AbsenceTypeSeed {
    /// Tenant the type belongs to
    pub tenant_id: u32,
    /// Unique name within the tenant
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Calendar color
    #[serde(default)]
    pub color: Option<String>,
    /// Whether approved requests consume allowance
    #[serde(default = "default_true")]
    pub deducts_from_allowance: bool,
    /// Whether requests need a reviewer decision
    #[serde(default = "default_true")]
    pub requires_approval: bool,
    /// Whether approval goes through document signing
    #[serde(default)]
    pub requires_signing: bool,
    /// Signing template reference
    #[serde(default)]
    pub signing_template_id: Option<String>,
    /// Display ordering
    #[serde(default)]
    pub sort_order: i32,
}

const fn default_true() -> bool {
    true
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the path in `LEAVE_CONFIG` or `./config.toml`,
/// falling back to defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("LEAVE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(path)
    } else {
        tracing::info!("No config file at {path}, using defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r##"
            database_url = "sqlite::memory:"

            [events]
            enabled = true
            topic_prefix = "signing"
            subscribe_events = ["signing.request.completed", "signing.request.declined"]
            shutdown_timeout_secs = 2

            [[absence_types]]
            tenant_id = 1
            name = "Vacation"
            color = "#22c55e"

            [[absence_types]]
            tenant_id = 1
            name = "Parental leave"
            deducts_from_allowance = false
            requires_signing = true
            signing_template_id = "tpl-parental"
        "##;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(
            config.events.channels(),
            vec![
                "signing.signing.request.completed".to_string(),
                "signing.signing.request.declined".to_string()
            ]
        );
        assert_eq!(config.events.shutdown_timeout(), Duration::from_secs(2));

        assert_eq!(config.absence_types.len(), 2);
        assert!(config.absence_types[0].deducts_from_allowance);
        assert!(config.absence_types[0].requires_approval);
        assert!(!config.absence_types[0].requires_signing);
        assert_eq!(config.absence_types[0].color.as_deref(), Some("#22c55e"));
        assert!(!config.absence_types[1].deducts_from_allowance);
        assert_eq!(
            config.absence_types[1].signing_template_id.as_deref(),
            Some("tpl-parental")
        );
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = parse_config("").unwrap();
        assert!(config.database_url.is_none());
        assert!(config.events.enabled);
        assert_eq!(
            config.events.channels(),
            vec!["paperless.signing.request.completed".to_string()]
        );
        assert!(config.absence_types.is_empty());
    }

    #[test]
    fn test_empty_prefix_falls_back() {
        let events = EventsConfig {
            topic_prefix: String::new(),
            ..EventsConfig::default()
        };
        assert_eq!(events.prefix(), "paperless");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("events = [");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}

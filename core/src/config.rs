//! Process configuration, read once at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::telemetry::TelemetryConfig;

pub const DEFAULT_SPEECH_ENDPOINT: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DIFY_USER: &str = "user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifyConfig {
    pub api_key: String,
    pub endpoint: String,
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveBackendConfig {
    pub endpoint: String,
}

/// Which response backend the process binds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSelection {
    Mock,
    Live(LiveBackendConfig),
}

impl BackendSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSelection::Mock => "mock",
            BackendSelection::Live(_) => "live",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dify: DifyConfig,
    pub speech: SpeechConfig,
    pub backend: BackendSelection,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let dify = DifyConfig {
            api_key: require("DIFY_API_KEY")?,
            endpoint: require("DIFY_API_ENDPOINT")?,
            user: get("DIFY_USER").unwrap_or_else(|| DEFAULT_DIFY_USER.into()),
        };

        let speech = SpeechConfig {
            api_key: get("SPEECH_API_KEY"),
            endpoint: get("SPEECH_API_ENDPOINT").unwrap_or_else(|| DEFAULT_SPEECH_ENDPOINT.into()),
        };

        let backend = match get("ZONOS_BACKEND")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("mock") => BackendSelection::Mock,
            Some("live") => BackendSelection::Live(LiveBackendConfig {
                endpoint: require("ZONOS_API_ENDPOINT")?,
            }),
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    var: "ZONOS_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let port = match get("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let server = ServerConfig {
            port,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        };

        let telemetry = TelemetryConfig {
            debug: get("DEBUG").map(|value| is_truthy(&value)).unwrap_or(false),
            json: get("LOG_JSON").map(|value| is_truthy(&value)).unwrap_or(false),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        };

        Ok(Self {
            dify,
            speech,
            backend,
            server,
            telemetry,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DIFY_API_KEY", "app-secret"),
        ("DIFY_API_ENDPOINT", "https://dify.example/v1"),
    ];

    #[test]
    fn applies_defaults_when_only_required_values_are_set() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).expect("config should load");

        assert_eq!(config.dify.api_key, "app-secret");
        assert_eq!(config.dify.user, "user");
        assert_eq!(config.speech.endpoint, DEFAULT_SPEECH_ENDPOINT);
        assert!(config.speech.api_key.is_none());
        assert!(matches!(config.backend, BackendSelection::Mock));
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.upload_dir, PathBuf::from(DEFAULT_UPLOAD_DIR));
        assert!(!config.telemetry.debug);
        assert!(config.telemetry.log_dir.is_none());
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = AppConfig::from_lookup(lookup(&[("DIFY_API_ENDPOINT", "https://dify")]))
            .expect_err("missing key must fail");
        assert_eq!(err, ConfigError::MissingVar("DIFY_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DIFY_API_KEY", "app-secret"),
            ("DIFY_API_ENDPOINT", "   "),
        ]))
        .expect_err("blank endpoint must fail");
        assert_eq!(err, ConfigError::MissingVar("DIFY_API_ENDPOINT"));
    }

    #[test]
    fn live_backend_requires_endpoint() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ZONOS_BACKEND", "live"));
        let err = AppConfig::from_lookup(lookup(&pairs)).expect_err("live needs endpoint");
        assert_eq!(err, ConfigError::MissingVar("ZONOS_API_ENDPOINT"));

        pairs.push(("ZONOS_API_ENDPOINT", "http://zonos.local"));
        let config = AppConfig::from_lookup(lookup(&pairs)).expect("live config should load");
        match config.backend {
            BackendSelection::Live(live) => assert_eq!(live.endpoint, "http://zonos.local"),
            other => panic!("unexpected backend selection: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_backend_and_bad_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ZONOS_BACKEND", "remote"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::InvalidVar { var: "ZONOS_BACKEND", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::InvalidVar { var: "PORT", .. })
        ));
    }

    #[test]
    fn debug_flag_accepts_common_truthy_values() {
        for value in ["true", "TRUE", "1", "yes", "on"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("DEBUG", value));
            let config = AppConfig::from_lookup(lookup(&pairs)).expect("config should load");
            assert!(config.telemetry.debug, "{value} should enable debug");
        }
    }
}

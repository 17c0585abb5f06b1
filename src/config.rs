//! Client configuration.
//!
//! Three layers, highest priority first: CLI flags, environment
//! (`CHAT_API_BASE_URL`), and an optional TOML file passed with `--config`.

use std::path::Path;

use serde::Deserialize;

use crate::error::ChatError;

/// Environment variable naming the backend base URL.
pub const API_BASE_ENV: &str = "CHAT_API_BASE_URL";

/// REST base URL used when nothing is configured. The WebSocket has no such
/// fallback: without an explicit backend address no connection is attempted.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Path of the chat socket on the backend.
pub const CHAT_WS_PATH: &str = "/ws/chat";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_base_url: Option<String>,
    pub collection: Option<String>,
    pub log_filter: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend address as configured; `None` means "not configured".
    pub api_base_url: Option<String>,
    pub collection: Option<String>,
    pub log_filter: String,
}

impl ClientConfig {
    /// Merge the layers. `env_base_url` is passed in rather than read here so
    /// callers (and tests) control the environment.
    pub fn resolve(
        cli_base_url: Option<&str>,
        cli_collection: Option<&str>,
        env_base_url: Option<&str>,
        file: FileConfig,
    ) -> Self {
        let api_base_url = first_non_empty([cli_base_url, env_base_url, file.api_base_url.as_deref()]);
        let collection = first_non_empty([cli_collection, file.collection.as_deref()]);
        ClientConfig {
            api_base_url,
            collection,
            log_filter: file
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Base URL for REST calls.
    pub fn rest_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Chat socket endpoint, or `None` when no backend is configured.
    pub fn ws_endpoint(&self) -> Option<String> {
        self.api_base_url.as_deref().map(ws_endpoint)
    }
}

/// Derive the chat socket URL from an HTTP base URL.
///
/// `http://` becomes `ws://`, `https://` becomes `wss://`, and a bare host
/// is treated as plain `ws://`.
pub fn ws_endpoint(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        format!("ws://{}", base)
    };
    format!("{}{}", ws_base, CHAT_WS_PATH)
}

fn first_non_empty<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case("http://localhost:8000", "ws://localhost:8000/ws/chat")]
    #[case("https://chat.example.com/", "wss://chat.example.com/ws/chat")]
    #[case("localhost:8000", "ws://localhost:8000/ws/chat")]
    #[case("wss://edge.example.com", "wss://edge.example.com/ws/chat")]
    fn test_ws_endpoint(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(ws_endpoint(base), expected);
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = FileConfig {
            api_base_url: Some("http://file:1".into()),
            ..Default::default()
        };
        let cfg = ClientConfig::resolve(Some("http://cli:1"), None, Some("http://env:1"), file.clone());
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://cli:1"));

        let cfg = ClientConfig::resolve(None, None, Some("http://env:1"), file.clone());
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://env:1"));

        let cfg = ClientConfig::resolve(None, None, None, file);
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://file:1"));
    }

    #[test]
    fn test_empty_values_do_not_count() {
        let cfg = ClientConfig::resolve(Some("  "), Some(""), Some(""), FileConfig::default());
        assert!(cfg.api_base_url.is_none());
        assert!(cfg.collection.is_none());
        assert!(cfg.ws_endpoint().is_none());
    }

    #[test]
    fn test_rest_base_falls_back_to_default() {
        let cfg = ClientConfig::resolve(None, None, None, FileConfig::default());
        assert_eq!(cfg.rest_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_rest_base_strips_trailing_slash() {
        let cfg = ClientConfig::resolve(Some("http://host:9/"), None, None, FileConfig::default());
        assert_eq!(cfg.rest_base_url(), "http://host:9");
    }

    #[test]
    fn test_file_config_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base_url = \"http://10.0.0.2:8000\"").unwrap();
        writeln!(file, "collection = \"manuals\"").unwrap();
        writeln!(file, "log_filter = \"docchat=debug\"").unwrap();
        let cfg = FileConfig::load(file.path()).unwrap();
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(cfg.collection.as_deref(), Some("manuals"));
        assert_eq!(cfg.log_filter.as_deref(), Some("docchat=debug"));
    }

    #[test]
    fn test_file_config_rejects_unknown_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base = \"typo\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_file_config_missing_file_is_io_error() {
        let err = FileConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ChatError::Io(_)));
    }
}

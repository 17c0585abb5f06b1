//! Crate-level error type.

use thiserror::Error;

/// Every fallible operation in the client returns this error.
///
/// None of these are fatal to the chat view: the controller turns each one
/// into a user-visible message and keeps running.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No backend address was configured, so no connection is attempted.
    #[error("backend address is not configured (set CHAT_API_BASE_URL or pass --api-base-url)")]
    MissingBackend,

    /// The WebSocket could not be opened, or died while frames were queued.
    #[error("websocket: {0}")]
    Transport(String),

    /// An inbound frame or response body was not the JSON we expected.
    #[error("malformed payload: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The server replied with a non-2xx status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The HTTP request never produced a response.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("clipboard: {0}")]
    Clipboard(String),
}

impl ChatError {
    pub(crate) fn request(url: &str, source: reqwest::Error) -> Self {
        ChatError::Request {
            url: url.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_backend_mentions_env_var() {
        let msg = ChatError::MissingBackend.to_string();
        assert!(msg.contains("CHAT_API_BASE_URL"));
    }

    #[test]
    fn test_http_error_display() {
        let err = ChatError::Http {
            status: 502,
            url: "http://localhost:8000/list-docs".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 from http://localhost:8000/list-docs");
    }

    #[test]
    fn test_protocol_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: ChatError = parse_err.into();
        assert!(matches!(err, ChatError::Protocol(_)));
        assert!(err.to_string().starts_with("malformed payload"));
    }

    #[test]
    fn test_io_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: ChatError = io.into();
        assert_eq!(err.to_string(), "no such file");
    }
}

//! Error types for the relay.

use thiserror::Error;

/// Errors from stream decoding and adapter supervision.
#[derive(Debug, Error)]
pub enum DapError {
    /// Adapter process failed to start.
    #[error("adapter failed to start: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// A `Content-Length` header value that is not a non-negative integer.
    #[error("invalid Content-Length value '{value}'")]
    InvalidContentLength {
        /// The raw header value that failed to parse.
        value: String,
    },

    /// A frame body that is not valid UTF-8.
    #[error("message body is not valid UTF-8: {0}")]
    BodyEncoding(#[from] std::str::Utf8Error),

    /// A frame body that is not valid JSON.
    #[error("message body is not valid JSON: {0}")]
    BodyJson(#[from] serde_json::Error),

    /// Operation requires a started adapter process.
    #[error("adapter process not started")]
    NotStarted,

    /// The writer channel to the adapter is gone (process exited or shut down).
    #[error("adapter channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_spawn_failed_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "binary missing");
        let err = DapError::SpawnFailed(io_err);
        assert!(err.to_string().contains("adapter failed to start"));
        assert!(err.to_string().contains("binary missing"));
    }

    #[test]
    fn error_invalid_content_length_display() {
        let err = DapError::InvalidContentLength {
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "invalid Content-Length value 'abc'");
    }

    #[test]
    fn error_body_json_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = DapError::BodyJson(json_err);
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn error_body_encoding_from() {
        let utf8_err = std::str::from_utf8(&[0xff, 0xfe]).unwrap_err();
        let err: DapError = utf8_err.into();
        assert!(matches!(err, DapError::BodyEncoding(_)));
    }

    #[test]
    fn error_not_started_display() {
        assert_eq!(
            DapError::NotStarted.to_string(),
            "adapter process not started"
        );
    }

    #[test]
    fn error_channel_closed_display() {
        assert_eq!(DapError::ChannelClosed.to_string(), "adapter channel closed");
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: DapError = io_err.into();
        assert!(matches!(err, DapError::SpawnFailed(_)));
    }
}

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend {address} unreachable: {source}")]
    BackendUnreachable {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolError),

    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a line read off the wire is rejected before it is counted or forwarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("message length {len} is too short to carry a type tag")]
    TooShort { len: usize },

    #[error("unknown message type {tag:?}, expected REQ, ACK or NAK")]
    UnknownType { tag: String },

    #[error("message exceeds {max} bytes")]
    TooLong { max: usize },
}

impl Error {
    pub fn bind<T: fmt::Display>(address: T, source: std::io::Error) -> Self {
        Error::Bind {
            address: address.to_string(),
            source,
        }
    }

    pub fn backend_unreachable<T: fmt::Display>(address: T, source: std::io::Error) -> Self {
        Error::BackendUnreachable {
            address: address.to_string(),
            source,
        }
    }

    /// Errors that end a single session rather than the whole process.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            Error::BackendUnreachable { .. } | Error::ProtocolViolation(_) | Error::Connection(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_bind_error_is_fatal() {
        let err = Error::bind("127.0.0.1:8002", io::Error::from(io::ErrorKind::AddrInUse));
        assert!(!err.is_session_scoped());
        assert!(err.to_string().starts_with("failed to bind 127.0.0.1:8002"));
    }

    #[test]
    fn test_session_errors() {
        let unreachable = Error::backend_unreachable(
            "127.0.0.1:8001",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert!(unreachable.is_session_scoped());

        let violation: Error = ProtocolError::TooShort { len: 2 }.into();
        assert!(violation.is_session_scoped());
        assert!(matches!(
            violation,
            Error::ProtocolViolation(ProtocolError::TooShort { len: 2 })
        ));

        let io_err: Error = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(io_err.is_session_scoped());
    }

    #[test]
    fn test_listener_io_error_is_not_session_scoped() {
        let err = Error::Io(io::Error::from(io::ErrorKind::InvalidInput));
        assert!(!err.is_session_scoped());
        assert_eq!(err.to_string(), "IO error: invalid input parameter");
    }

    #[test]
    fn test_unknown_type_message() {
        let err = ProtocolError::UnknownType {
            tag: "FOO".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown message type \"FOO\", expected REQ, ACK or NAK"
        );
    }
}

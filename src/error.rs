//! Typed errors for the status server.
//!
//! Only listener setup can fail loudly. Marker failures never leave the
//! monitor: [`MarkerError`] exists so the reason a marker was rejected can be
//! logged before it collapses to "never seen".

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Why a freshness marker could not be turned into a timestamp.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("reading freshness marker: {0}")]
    Io(#[from] io::Error),

    #[error("freshness marker is empty")]
    Empty,

    #[error("freshness marker is not a non-negative timestamp: {0:?}")]
    Malformed(String),
}

/// Fatal startup failures of the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_into_marker_errors() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err: MarkerError = io_err.into();
        assert!(matches!(err, MarkerError::Io(_)));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn malformed_marker_message_quotes_the_content() {
        let err = MarkerError::Malformed("abc".into());
        assert_eq!(
            err.to_string(),
            "freshness marker is not a non-negative timestamp: \"abc\""
        );
    }

    #[test]
    fn bind_error_names_the_address() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:8081".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:8081"), "message: {msg}");
        assert!(msg.contains("address in use"), "message: {msg}");
    }
}

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

pub type WebResult<T> = Result<T, WebError>;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("diagnostic service stopped: {0}")]
    Serve(#[source] io::Error),

    #[error(transparent)]
    Diagnostic(#[from] codediag_core::DiagnosticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebError::Bind {
            addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:8888: address in use");
    }
}

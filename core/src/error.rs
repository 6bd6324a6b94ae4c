use codediag_ast::LocateError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagnosticError>;

#[derive(Error, Debug)]
pub enum DiagnosticError {
    /// The source root could not be determined
    #[error("get working path failed: {0}")]
    Environment(String),

    #[error(transparent)]
    Locate(#[from] LocateError),

    /// The chat backend reported an error event
    #[error("chat response error: {0}")]
    Transport(String),

    /// The event stream closed without `Done` or `Error`
    #[error("chat stream closed without a terminal event")]
    Protocol,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DiagnosticError {
    /// Transport and protocol faults end a console session
    pub const fn is_stream_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol)
    }
}

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read backtrace file {}: {source}", path.display())]
    ReadTrace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backtrace file {} is empty", .0.display())]
    EmptyTrace(PathBuf),

    #[error(transparent)]
    Diagnostic(#[from] codediag::Error),
}

impl From<codediag::DiagnosticError> for CliError {
    fn from(e: codediag::DiagnosticError) -> Self {
        Self::Diagnostic(e.into())
    }
}

use codediag_core::DiagnosticError;
use codediag_web::WebError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),

    #[error(transparent)]
    Web(#[from] WebError),
}

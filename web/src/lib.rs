//! Web delivery of a diagnosis: a small axum API behind the dashboard.

pub mod app;
pub mod envelope;
pub mod error;
pub mod routes;
pub mod state;

pub use app::create_app;
pub use app::serve;
pub use envelope::Envelope;
pub use error::WebError;
pub use error::WebResult;
pub use state::WebState;

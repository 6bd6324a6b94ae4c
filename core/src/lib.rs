//! Diagnosis pipeline for captured failures.
//!
//! Frames are captured ([`frames`]), resolved to source through
//! `codediag-ast`, grouped into a [`catalog::FunctionCatalog`], turned into a
//! prompt ([`prompt`]) and streamed through a [`client::Chat`] backend.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod failure;
pub mod frames;
pub mod prompt;
pub mod sink;

pub use catalog::FunctionCatalog;
pub use client::Chat;
pub use client::ChatGpt;
pub use client::EventStream;
pub use client::Message;
pub use client::Role;
pub use client::StreamEvent;
pub use config::ChatGptConfig;
pub use config::DiagnosticContext;
pub use config::SessionConfig;
pub use error::DiagnosticError;
pub use error::Result;
pub use failure::Failure;
pub use frames::CallSite;
pub use frames::FrameSource;
pub use frames::LiveFrames;
pub use frames::TextTrace;
pub use prompt::PromptBuilder;
pub use sink::ConsoleSink;

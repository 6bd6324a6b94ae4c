//! Session options and the process-wide diagnostic context.

use crate::error::DiagnosticError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

pub const DEFAULT_WEB_PORT: u16 = 8888;
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

/// Options fixed for the lifetime of one diagnosis session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub use_chinese_output: bool,
    pub use_web_mode: bool,
    pub web_port: u16,
    pub max_stack_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            use_chinese_output: false,
            use_web_mode: false,
            web_port: DEFAULT_WEB_PORT,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

impl SessionConfig {
    pub const fn with_chinese_output(mut self, enabled: bool) -> Self {
        self.use_chinese_output = enabled;
        self
    }

    /// Serve the diagnosis on a local dashboard instead of the console
    pub const fn with_web_mode(mut self, port: u16) -> Self {
        self.use_web_mode = true;
        self.web_port = port;
        self
    }

    pub const fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }
}

/// Source root plus session options, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticContext {
    /// Frames outside this directory are not part of the diagnosed program
    pub source_root: PathBuf,
    pub session: SessionConfig,
}

impl DiagnosticContext {
    /// Context rooted at the current working directory
    pub fn from_current_dir(session: SessionConfig) -> Result<Self> {
        let source_root =
            std::env::current_dir().map_err(|e| DiagnosticError::Environment(e.to_string()))?;
        Ok(Self::new(source_root, session))
    }

    pub fn new(source_root: impl Into<PathBuf>, session: SessionConfig) -> Self {
        Self {
            source_root: source_root.into(),
            session,
        }
    }

    /// Path relative to the source root, unchanged when outside it
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.source_root).unwrap_or(path)
    }
}

/// Connection settings for an OpenAI-compatible backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatGptConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ChatGptConfig {
    /// Read `API_KEY`, `BASE_URL` and `MODEL`, loading `dev.env` and `.env` first
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::from_filename("dev.env") {
            tracing::debug!("dev.env not loaded: {e}");
        }
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(".env not loaded: {e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_key = non_empty("API_KEY")
            .ok_or_else(|| DiagnosticError::Config("API_KEY is not set".to_string()))?;

        Ok(Self {
            api_key,
            base_url: non_empty("BASE_URL"),
            model: non_empty("MODEL"),
        })
    }
}

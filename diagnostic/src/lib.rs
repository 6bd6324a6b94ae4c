//! Catch a panic, collect the source of the functions on its stack and stream
//! a diagnosis from a chat model to the console or a local dashboard.
//!
//! ```no_run
//! use codediag::ChatGpt;
//! use codediag::Diagnostic;
//! use codediag::SessionConfig;
//!
//! # async fn run() -> codediag::Result<()> {
//! let diag = Diagnostic::new(ChatGpt::new("sk-..."), SessionConfig::default())?;
//! if let Err(failure) = diag.catch(|| {
//!     let v: Vec<i32> = Vec::new();
//!     v[0]
//! }) {
//!     diag.diagnose(failure).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod capture;
pub mod error;

pub use codediag_core::ChatGpt;
pub use codediag_core::ChatGptConfig;
pub use codediag_core::DiagnosticContext;
pub use codediag_core::DiagnosticError;
pub use codediag_core::Failure;
pub use codediag_core::SessionConfig;
pub use error::Error;
pub use error::Result;

use codediag_ast::SourceLocator;
use codediag_core::Chat;
use codediag_core::ConsoleSink;
use codediag_core::FunctionCatalog;
use codediag_core::PromptBuilder;
use codediag_web::WebState;
use std::io::Write;
use std::panic::UnwindSafe;
use std::sync::Arc;

/// Entry point of the library: owns the context and the chat backend
pub struct Diagnostic {
    ctx: Arc<DiagnosticContext>,
    chat: Arc<dyn Chat>,
    locator: SourceLocator,
}

impl Diagnostic {
    /// Diagnostic rooted at the current working directory
    pub fn new(chat: impl Chat + 'static, session: SessionConfig) -> Result<Self> {
        let ctx = DiagnosticContext::from_current_dir(session)?;
        Ok(Self::with_context(Arc::new(chat), ctx))
    }

    pub fn with_context(chat: Arc<dyn Chat>, ctx: DiagnosticContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            chat,
            locator: SourceLocator::new(),
        }
    }

    pub fn context(&self) -> &DiagnosticContext {
        &self.ctx
    }

    /// Run `f`, returning the captured [`Failure`] if it panics.
    ///
    /// A temporary panic hook records the stack of the panicking thread while
    /// `f` runs; the previous hook is restored before returning. Panics on
    /// other threads go to the previous hook.
    pub fn catch<R>(&self, f: impl FnOnce() -> R + UnwindSafe) -> std::result::Result<R, Failure> {
        capture::catch(&self.ctx, f)
    }

    /// Capture the current stack with an arbitrary error text
    pub fn breakpoint(&self, message: impl Into<String>) -> Failure {
        Failure::capture(message, &self.ctx)
    }

    /// Diagnose on the console, or serve the dashboard in web mode
    pub async fn diagnose(&self, failure: Failure) -> Result<()> {
        failure.log_detected();
        if self.ctx.session.use_web_mode {
            self.serve(failure).await
        } else {
            self.diagnose_to(&failure, &mut ConsoleSink::stdout()).await
        }
    }

    /// Stream the console diagnosis of `failure` into `sink`
    pub async fn diagnose_to<W: Write>(&self, failure: &Failure, sink: &mut ConsoleSink<W>) -> Result<()> {
        let catalog = FunctionCatalog::collect(&failure.call_sites, &self.locator, true)?;
        tracing::debug!(functions = catalog.len(), "source catalog ready");
        let messages = PromptBuilder::new(&self.ctx).console_messages(
            &failure.message,
            &failure.stack,
            &catalog,
        );
        sink.drain(self.chat.chat(messages)).await?;
        Ok(())
    }

    async fn serve(&self, failure: Failure) -> Result<()> {
        let state = WebState::new(Arc::clone(&self.ctx), failure, Arc::clone(&self.chat))?;
        codediag_web::serve(Arc::new(state), self.ctx.session.web_port).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostic")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

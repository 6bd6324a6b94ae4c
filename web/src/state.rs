//! Read-only diagnosis state shared by every request.

use codediag_ast::Function;
use codediag_ast::SourceLocator;
use codediag_core::Chat;
use codediag_core::DiagnosticContext;
use codediag_core::Failure;
use codediag_core::FunctionCatalog;
use codediag_core::Result;
use std::sync::Arc;

pub struct WebState {
    pub ctx: Arc<DiagnosticContext>,
    pub panic: String,
    pub stack: String,
    /// Strict catalog of the live frames; feeds the prompt
    pub local_catalog: FunctionCatalog,
    /// Non-strict functions of the rendered stack; shown on the dashboard
    pub functions: Vec<Function>,
    pub chat: Arc<dyn Chat>,
    pub locator: SourceLocator,
}

impl WebState {
    /// Resolve both catalogs up front; fatal locate errors abort startup
    pub fn new(ctx: Arc<DiagnosticContext>, failure: Failure, chat: Arc<dyn Chat>) -> Result<Self> {
        let locator = SourceLocator::new();
        let local_catalog = FunctionCatalog::collect(&failure.call_sites, &locator, true)?;
        let text_sites = failure.text_call_sites(&ctx);
        let functions = FunctionCatalog::collect(&text_sites, &locator, false)?
            .functions()
            .cloned()
            .collect();

        Ok(Self {
            ctx,
            panic: failure.message,
            stack: failure.stack,
            local_catalog,
            functions,
            chat,
            locator,
        })
    }
}

impl std::fmt::Debug for WebState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebState")
            .field("ctx", &self.ctx)
            .field("panic", &self.panic)
            .field("local_catalog", &self.local_catalog.len())
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}

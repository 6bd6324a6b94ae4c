//! A captured panic or error breakpoint.

use crate::config::DiagnosticContext;
use crate::frames::CallSite;
use crate::frames::FrameSource;
use crate::frames::LiveFrames;
use crate::frames::TextTrace;
use backtrace::Backtrace;
use serde::Deserialize;
use serde::Serialize;
use std::any::Any;

/// Failure text, its rendered stack and the call sites of the program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    pub stack: String,
    pub call_sites: Vec<CallSite>,
}

impl Failure {
    /// Capture the current stack with both the live and the rendered view
    pub fn capture(message: impl Into<String>, ctx: &DiagnosticContext) -> Self {
        let stack = format!("{:?}", Backtrace::new());
        let call_sites = LiveFrames.call_sites(ctx);
        Self {
            message: message.into(),
            stack,
            call_sites,
        }
    }

    /// Failure from a saved backtrace; call sites come from its text
    pub fn from_trace(
        message: impl Into<String>,
        stack: impl Into<String>,
        ctx: &DiagnosticContext,
    ) -> Self {
        let trace = TextTrace::new(stack);
        let call_sites = trace.call_sites(ctx);
        Self {
            message: message.into(),
            stack: trace.text().to_string(),
            call_sites,
        }
    }

    /// Call sites recovered from the rendered stack rather than the live walk
    pub fn text_call_sites(&self, ctx: &DiagnosticContext) -> Vec<CallSite> {
        TextTrace::new(self.stack.as_str()).call_sites(ctx)
    }

    pub fn log_detected(&self) {
        tracing::error!(
            "diagnostic detected:\n\n\t{}\n\n\t{}",
            self.message,
            self.stack.replace('\n', "\n\t")
        );
    }
}

/// Text of a panic payload; non-string payloads get a generic description
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

//! Call-site capture.
//!
//! Two frame sources feed the same filter: [`LiveFrames`] walks the current
//! stack with the `backtrace` symbolizer, [`TextTrace`] parses a rendered
//! backtrace. Both yield the call sites that belong to the diagnosed program,
//! innermost first, starting after the last panic-dispatch frame.

use crate::config::DiagnosticContext;
use codediag_ast::strip_symbol_hash;
use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Crates whose frames are never part of the diagnosed program
const LIBRARY_CRATES: &[&str] = &[
    "backtrace",
    "codediag",
    "codediag_ast",
    "codediag_core",
    "codediag_web",
];

/// Panic-initiation machinery; `std::panicking::try` and friends that wrap
/// `catch_unwind` sit above the program frames and are not listed
const PANIC_DISPATCH_PREFIXES: &[&str] = &[
    "core::panicking::",
    "std::panicking::begin_panic",
    "std::panicking::rust_panic",
    "std::rt::begin_panic",
];

#[allow(clippy::expect_used)]
static AT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+at\s+(?P<file>.+?):(?P<line>\d+)(?::\d+)?\s*$").expect("valid at-line regex")
});

#[allow(clippy::expect_used)]
static FRAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*\d+:\s+|\s+)(?:0x[0-9a-fA-F]+ - )?(?P<symbol>\S.*?)\s*$")
        .expect("valid frame-line regex")
});

/// One frame of the diagnosed program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Demangled symbol without the `::h<hash>` suffix
    pub qualified_name: String,
    pub file: PathBuf,
    pub line: usize,
}

/// A symbolized frame before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub symbol: String,
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
}

/// Strategy for producing call sites
pub trait FrameSource {
    fn call_sites(&self, ctx: &DiagnosticContext) -> Vec<CallSite>;
}

/// Walks the stack of the calling thread at the moment `call_sites` runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveFrames;

impl LiveFrames {
    /// Symbolize at most `max_depth` frames, inlined symbols included
    pub fn capture(max_depth: usize) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        let mut depth = 0usize;
        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                frames.push(RawFrame {
                    symbol: symbol
                        .name()
                        .map(|name| format!("{name:#}"))
                        .unwrap_or_default(),
                    file: symbol.filename().map(Path::to_path_buf),
                    line: symbol.lineno().map(|line| line as usize),
                });
            });
            depth += 1;
            depth < max_depth
        });
        frames
    }
}

impl FrameSource for LiveFrames {
    fn call_sites(&self, ctx: &DiagnosticContext) -> Vec<CallSite> {
        filter_frames(Self::capture(ctx.session.max_stack_depth), ctx)
    }
}

/// A rendered backtrace, as printed by `RUST_BACKTRACE=1` or `{:?}` of a
/// `backtrace::Backtrace`
#[derive(Debug, Clone)]
pub struct TextTrace {
    text: String,
}

impl TextTrace {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Frame records in trace order; lines that are neither frames nor
    /// locations are ignored
    pub fn parse(&self) -> Vec<RawFrame> {
        let mut frames: Vec<RawFrame> = Vec::new();
        for line in self.text.lines() {
            if let Some(caps) = AT_LINE.captures(line) {
                let Some(last) = frames.last_mut() else {
                    continue;
                };
                if last.file.is_none() {
                    last.file = Some(PathBuf::from(&caps["file"]));
                    last.line = caps["line"].parse().ok();
                }
            } else if let Some(caps) = FRAME_LINE.captures(line) {
                frames.push(RawFrame {
                    symbol: caps["symbol"].to_string(),
                    ..RawFrame::default()
                });
            }
        }
        frames
    }
}

impl FrameSource for TextTrace {
    fn call_sites(&self, ctx: &DiagnosticContext) -> Vec<CallSite> {
        filter_frames(self.parse(), ctx)
    }
}

/// Keep the frames of the diagnosed program, innermost first.
///
/// A panic-dispatch frame discards everything collected before it. Frames
/// without a location, outside the source root, or inside a library crate are
/// dropped. Relative paths resolve against the source root.
pub fn filter_frames(
    frames: impl IntoIterator<Item = RawFrame>,
    ctx: &DiagnosticContext,
) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for frame in frames {
        if is_panic_dispatch(&frame.symbol) {
            sites.clear();
            continue;
        }
        let Some(file) = frame.file else {
            continue;
        };
        let file = if file.is_relative() {
            ctx.source_root.join(file).clean()
        } else {
            file.clean()
        };
        if !file.starts_with(&ctx.source_root) || is_library_frame(&frame.symbol) {
            continue;
        }
        sites.push(CallSite {
            qualified_name: strip_symbol_hash(&frame.symbol).to_string(),
            file,
            line: frame.line.unwrap_or_default(),
        });
    }
    sites
}

fn is_panic_dispatch(symbol: &str) -> bool {
    let symbol = symbol.trim_start_matches('<');
    symbol.ends_with("rust_begin_unwind")
        || PANIC_DISPATCH_PREFIXES
            .iter()
            .any(|prefix| symbol.starts_with(prefix))
}

fn is_library_frame(symbol: &str) -> bool {
    let symbol = symbol
        .trim_start_matches(['<', '&'])
        .trim_start_matches("mut ");
    let krate = symbol.split("::").next().unwrap_or_default();
    LIBRARY_CRATES.contains(&krate)
}

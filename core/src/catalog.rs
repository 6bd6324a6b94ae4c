//! Functions grouped by file, in the order the stack first reached them.

use crate::config::DiagnosticContext;
use crate::error::Result;
use crate::frames::CallSite;
use codediag_ast::Function;
use codediag_ast::LocateError;
use codediag_ast::SourceLocator;
use codediag_ast::normalize_symbol;
use codediag_ast::trait_default_name;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionCatalog {
    files: Vec<(PathBuf, Vec<Function>)>,
    seen: HashSet<(PathBuf, String)>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate every call site and aggregate the results.
    ///
    /// A recoverable miss becomes a placeholder when `strict` is false and is
    /// skipped with a warning otherwise. Fatal locate errors are returned.
    pub fn collect(sites: &[CallSite], locator: &SourceLocator, strict: bool) -> Result<Self> {
        let mut catalog = Self::new();
        for site in sites {
            let function = match locator.locate(&site.file, &site.qualified_name, strict) {
                Ok(mut function) => {
                    function.line = site.line;
                    if !signature_matches(site, &function) {
                        function.params.clear();
                        function.results.clear();
                    }
                    function
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    if strict {
                        warn_skipped(site, &e);
                        continue;
                    }
                    tracing::debug!(name = %site.qualified_name, "using placeholder: {e}");
                    Function::placeholder(
                        normalize_symbol(&site.qualified_name),
                        site.file.clone(),
                        site.line,
                    )
                }
            };
            catalog.insert(function);
        }
        Ok(catalog)
    }

    /// Add a function; a repeated `(file, name)` pair is ignored
    pub fn insert(&mut self, function: Function) -> bool {
        let key = (function.file.clone(), function.name.clone());
        if !self.seen.insert(key) {
            return false;
        }
        match self.files.iter_mut().find(|(file, _)| *file == function.file) {
            Some((_, functions)) => functions.push(function),
            None => self.files.push((function.file.clone(), vec![function])),
        }
        true
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &[Function])> {
        self.files
            .iter()
            .map(|(file, functions)| (file.as_path(), functions.as_slice()))
    }

    /// All functions, file by file
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.files.iter().flat_map(|(_, functions)| functions.iter())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Source listing for the prompt, one fenced block per file
    pub fn render(&self, ctx: &DiagnosticContext) -> String {
        let mut out = String::new();
        for (file, functions) in self.files() {
            let sources: Vec<&str> = functions
                .iter()
                .filter(|f| !f.is_placeholder())
                .map(|f| f.source.as_str())
                .collect();
            if sources.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "{}:\n```rust\n{}\n```\n",
                ctx.relative(file).display(),
                sources.join("\n\n")
            ));
        }
        out
    }
}

/// A bare-name match on another receiver has the right body but possibly
/// another signature
fn signature_matches(site: &CallSite, function: &Function) -> bool {
    normalize_symbol(&site.qualified_name).ends_with(&function.name)
        || trait_default_name(&site.qualified_name).as_deref() == Some(function.name.as_str())
}

fn warn_skipped(site: &CallSite, e: &LocateError) {
    tracing::warn!(
        file = %site.file.display(),
        line = site.line,
        "skipping frame {}: {e}",
        site.qualified_name
    );
}

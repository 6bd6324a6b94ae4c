//! Locate a named declaration in a source file and extract its exact text.

use crate::error::LocateError;
use crate::error::LocateResult;
use crate::grammar::Declaration;
use crate::grammar::Grammar;
use crate::grammar::RustGrammar;
use crate::source_cache::SourceCache;
use crate::types::DeclKind;
use crate::types::Function;
use crate::types::ParsedSource;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

/// Strip the legacy-mangling hash (`::h0123456789abcdef`) from a symbol
pub fn strip_symbol_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}

/// Reduce a demangled symbol to the `[Receiver::]name` form declarations use.
///
/// `<T as Trait>::m` becomes `T::m`, generic arguments are dropped, and
/// compiler-generated segments such as `{{closure}}` resolve to the enclosing
/// function. Of the remaining path only the last segment is kept, plus the one
/// before it when it names a type.
pub fn normalize_symbol(symbol: &str) -> String {
    let symbol = strip_symbol_hash(symbol.trim());

    let (path, forced_receiver) = match split_qualified_self(symbol) {
        Some((self_ty, rest)) => (format!("{self_ty}{rest}"), true),
        None => (symbol.to_string(), false),
    };

    let path = strip_generics(&path);
    let segments: Vec<&str> = path
        .split("::")
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();

    match segments.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [.., receiver, name] => {
            let is_type = receiver
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase());
            if is_type || (forced_receiver && segments.len() == 2) {
                format!("{receiver}::{name}")
            } else {
                (*name).to_string()
            }
        }
    }
}

/// Bare name used by the non-strict retry: everything through the last `::` removed
pub fn bare_name(name: &str) -> Option<&str> {
    name.rsplit_once("::").map(|(_, bare)| bare)
}

/// `<a::T<U> as b::Trait>::m` -> (`T<U>`, `::m`), keeping only the last self-type segment
fn split_qualified_self(symbol: &str) -> Option<(String, &str)> {
    let (inner, rest) = qualified_self_parts(symbol)?;
    let self_ty = top_level_split(inner, " as ").unwrap_or(inner);
    let self_ty = self_ty
        .trim()
        .trim_start_matches('&')
        .trim_start_matches("mut ")
        .trim();
    Some((last_segment(self_ty), rest))
}

/// `<T as a::Trait>::m` -> `Trait::m`, the default body an impl without its
/// own `m` runs
pub fn trait_default_name(symbol: &str) -> Option<String> {
    let (inner, rest) = qualified_self_parts(strip_symbol_hash(symbol.trim()))?;
    let self_ty = top_level_split(inner, " as ")?;
    let trait_path = inner.get(self_ty.len() + " as ".len()..)?.trim();
    let name = normalize_symbol(&format!("{}{rest}", last_segment(trait_path)));
    name.contains("::").then_some(name)
}

/// Split `<inner>rest` at the `>` closing the leading `<`
fn qualified_self_parts(symbol: &str) -> Option<(&str, &str)> {
    let inner_start = symbol.strip_prefix('<')?;
    let mut depth = 1usize;
    for (idx, ch) in inner_start.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&inner_start[..idx], &inner_start[idx + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn last_segment(path: &str) -> String {
    let path = strip_generics(path);
    path.rsplit("::").next().unwrap_or_default().to_string()
}

fn top_level_split<'a>(text: &'a str, needle: &str) -> Option<&'a str> {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 && text[idx..].starts_with(needle) => return Some(&text[..idx]),
            _ => {}
        }
    }
    None
}

fn strip_generics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Finds declarations by qualified name, caching parsed files
pub struct SourceLocator {
    grammar: Box<dyn Grammar>,
    cache: Mutex<SourceCache>,
}

impl std::fmt::Debug for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLocator")
            .field("grammar", &self.grammar.name())
            .finish_non_exhaustive()
    }
}

impl SourceLocator {
    /// Locator for Rust sources
    pub fn new() -> Self {
        Self::with_grammar(RustGrammar)
    }

    pub fn with_grammar(grammar: impl Grammar + 'static) -> Self {
        Self {
            grammar: Box::new(grammar),
            cache: Mutex::new(SourceCache::default()),
        }
    }

    /// Locate `qualified_name` in `file`.
    ///
    /// In non-strict mode a receiver-qualified name that misses is retried
    /// against its bare method name, for symbols whose receiver type the
    /// symbolizer could not resolve.
    pub fn locate(&self, file: &Path, qualified_name: &str, strict: bool) -> LocateResult<Function> {
        let name = normalize_symbol(qualified_name);
        let parsed = self.parsed(file)?;
        let declarations = self.grammar.declarations(&parsed);

        if let Some(decl) = declarations.iter().find(|d| d.qualified_name == name) {
            return self.extract(decl, &parsed);
        }

        // An impl that does not override a trait method runs the trait's default
        if let Some(default) = trait_default_name(qualified_name) {
            if let Some(decl) = declarations
                .iter()
                .find(|d| d.kind == DeclKind::Method && d.qualified_name == default)
            {
                return self.extract(decl, &parsed);
            }
        }

        if !strict {
            if let Some(bare) = bare_name(&name) {
                if let Some(decl) = declarations.iter().find(|d| d.bare_name == bare) {
                    tracing::debug!(
                        requested = %name,
                        found = %decl.qualified_name,
                        "matched declaration by bare name"
                    );
                    return self.extract(decl, &parsed);
                }
            }
        }

        Err(LocateError::NotFound {
            name,
            path: file.to_path_buf(),
        })
    }

    fn parsed(&self, file: &Path) -> LocateResult<Arc<ParsedSource>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parsed) = cache.get(file) {
            return Ok(parsed);
        }

        if !self.grammar.handles(file) {
            return Err(LocateError::Parse {
                path: file.to_path_buf(),
                message: format!("not a {} source file", self.grammar.name()),
            });
        }
        let source = std::fs::read_to_string(file).map_err(|e| LocateError::Io {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        let parsed = self.grammar.parse(file, source)?;
        Ok(cache.insert(parsed))
    }

    fn extract(&self, decl: &Declaration<'_>, parsed: &ParsedSource) -> LocateResult<Function> {
        let node = decl.node;
        let source = parsed
            .text(node.start_byte(), node.end_byte())
            .ok_or_else(|| LocateError::Parse {
                path: parsed.path.clone(),
                message: format!(
                    "declaration {} spans {}..{} outside the source",
                    decl.qualified_name,
                    node.start_byte(),
                    node.end_byte()
                ),
            })?;
        let signature = self.grammar.signature(decl, parsed)?;

        Ok(Function {
            name: decl.qualified_name.clone(),
            kind: decl.kind,
            params: signature.params,
            results: signature.results,
            file: parsed.path.clone(),
            source: source.to_string(),
            line: node.start_position().row + 1,
        })
    }
}

impl Default for SourceLocator {
    fn default() -> Self {
        Self::new()
    }
}

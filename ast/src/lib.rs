//! Source locator for diagnosed Rust programs.
//!
//! Given a source file and a symbol from a stack frame, the locator finds the
//! matching free function or method with tree-sitter and returns its verbatim
//! source text together with its signature.

pub mod error;
pub mod grammar;
pub mod locator;
pub mod render;
pub mod source_cache;
pub mod types;

pub use error::LocateError;
pub use error::LocateResult;
pub use grammar::Declaration;
pub use grammar::Grammar;
pub use grammar::RustGrammar;
pub use grammar::Signature;
pub use locator::SourceLocator;
pub use locator::normalize_symbol;
pub use locator::strip_symbol_hash;
pub use locator::trait_default_name;
pub use source_cache::SourceCache;
pub use types::DeclKind;
pub use types::Field;
pub use types::Function;
pub use types::ParsedSource;

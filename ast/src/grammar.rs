//! Grammar abstraction for the diagnosed program's language.
//!
//! A grammar parses one source file and enumerates the function-like
//! declarations it contains, each under the qualified name the locator matches
//! on. Only Rust is implemented.

use crate::error::LocateError;
use crate::error::LocateResult;
use crate::render::first_child_of_kind;
use crate::render::node_text;
use crate::render::render_type;
use crate::types::DeclKind;
use crate::types::Field;
use crate::types::ParsedSource;
use std::path::Path;
use tree_sitter::Node;
use tree_sitter::Parser;

/// A function-like declaration found in a parsed file
#[derive(Debug, Clone)]
pub struct Declaration<'tree> {
    /// `name` for functions, `Receiver::name` for methods
    pub qualified_name: String,
    pub bare_name: String,
    pub kind: DeclKind,
    pub node: Node<'tree>,
}

/// Parameter and result lists of a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

/// Source-parsing capability for one diagnosed language
pub trait Grammar: Send + Sync {
    /// Display name of the language
    fn name(&self) -> &'static str;

    /// Whether this grammar can parse the given file
    fn handles(&self, path: &Path) -> bool;

    fn parse(&self, path: &Path, source: String) -> LocateResult<ParsedSource>;

    /// All declarations in file order
    fn declarations<'a>(&self, parsed: &'a ParsedSource) -> Vec<Declaration<'a>>;

    fn signature(&self, decl: &Declaration<'_>, parsed: &ParsedSource) -> LocateResult<Signature>;
}

/// Rust grammar backed by tree-sitter-rust
#[derive(Debug, Clone, Copy, Default)]
pub struct RustGrammar;

impl Grammar for RustGrammar {
    fn name(&self) -> &'static str {
        "Rust"
    }

    fn handles(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("rs")
    }

    fn parse(&self, path: &Path, source: String) -> LocateResult<ParsedSource> {
        // Parser is neither Clone nor Sync, so one is built per parse
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| LocateError::Grammar(e.to_string()))?;

        let tree = parser.parse(&source, None).ok_or_else(|| LocateError::Parse {
            path: path.to_path_buf(),
            message: "Failed to parse source code".to_string(),
        })?;
        if tree.root_node().has_error() {
            tracing::debug!(path = %path.display(), "source parsed with syntax errors");
        }

        Ok(ParsedSource {
            path: path.to_path_buf(),
            tree,
            source,
        })
    }

    fn declarations<'a>(&self, parsed: &'a ParsedSource) -> Vec<Declaration<'a>> {
        let mut out = Vec::new();
        collect_items(parsed.tree.root_node(), parsed.source.as_bytes(), &mut out);
        out
    }

    fn signature(&self, decl: &Declaration<'_>, parsed: &ParsedSource) -> LocateResult<Signature> {
        let source = parsed.source.as_bytes();
        let mut signature = Signature::default();

        if let Some(parameters) = decl.node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for param in parameters.named_children(&mut cursor) {
                match param.kind() {
                    "self_parameter" => {
                        let text = node_text(param, source)?;
                        let ty = if !text.starts_with('&') {
                            "Self"
                        } else if first_child_of_kind(param, "mutable_specifier").is_some() {
                            "&mut Self"
                        } else {
                            "&Self"
                        };
                        signature.params.push(Field::named("self", ty));
                    }
                    "parameter" => {
                        let name = match param.child_by_field_name("pattern") {
                            Some(pattern) => node_text(pattern, source)?.to_string(),
                            None => "_".to_string(),
                        };
                        let ty = match param.child_by_field_name("type") {
                            Some(ty) => render_type(ty, source)?,
                            None => continue,
                        };
                        signature.params.push(Field::named(name, ty));
                    }
                    _ => {}
                }
            }
        }

        if let Some(return_type) = decl.node.child_by_field_name("return_type") {
            signature
                .results
                .push(Field::unnamed(render_type(return_type, source)?));
        }

        Ok(signature)
    }
}

/// Walk one item list: free functions, impl and trait blocks, inline modules
fn collect_items<'a>(list: Node<'a>, source: &[u8], out: &mut Vec<Declaration<'a>>) {
    let mut cursor = list.walk();
    for item in list.named_children(&mut cursor) {
        match item.kind() {
            "function_item" => {
                if let Some(name) = item_name(item, source) {
                    out.push(Declaration {
                        qualified_name: name.clone(),
                        bare_name: name,
                        kind: DeclKind::Function,
                        node: item,
                    });
                }
            }
            "impl_item" => {
                let receiver = item
                    .child_by_field_name("type")
                    .and_then(|ty| receiver_name(ty, source));
                if let (Some(receiver), Some(body)) = (receiver, item.child_by_field_name("body")) {
                    collect_methods(&receiver, body, source, out);
                }
            }
            // Only default methods have a body; bare signatures are skipped
            "trait_item" => {
                if let (Some(receiver), Some(body)) =
                    (item_name(item, source), item.child_by_field_name("body"))
                {
                    collect_methods(&receiver, body, source, out);
                }
            }
            "mod_item" => {
                if let Some(body) = item.child_by_field_name("body") {
                    collect_items(body, source, out);
                }
            }
            _ => {}
        }
    }
}

fn collect_methods<'a>(
    receiver: &str,
    body: Node<'a>,
    source: &[u8],
    out: &mut Vec<Declaration<'a>>,
) {
    let mut cursor = body.walk();
    for method in body.named_children(&mut cursor) {
        if method.kind() != "function_item" {
            continue;
        }
        if let Some(name) = item_name(method, source) {
            out.push(Declaration {
                qualified_name: format!("{receiver}::{name}"),
                bare_name: name,
                kind: DeclKind::Method,
                node: method,
            });
        }
    }
}

fn item_name(item: Node<'_>, source: &[u8]) -> Option<String> {
    item.child_by_field_name("name")
        .and_then(|name| name.utf8_text(source).ok())
        .map(str::to_string)
}

/// Self type of an impl block with generics and path stripped
fn receiver_name(ty: Node<'_>, source: &[u8]) -> Option<String> {
    match ty.kind() {
        "type_identifier" | "primitive_type" => ty.utf8_text(source).ok().map(str::to_string),
        "generic_type" | "reference_type" => ty
            .child_by_field_name("type")
            .and_then(|inner| receiver_name(inner, source)),
        "scoped_type_identifier" => ty
            .child_by_field_name("name")
            .and_then(|name| name.utf8_text(source).ok())
            .map(str::to_string),
        _ => None,
    }
}

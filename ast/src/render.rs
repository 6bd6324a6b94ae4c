//! Rendering of type expressions found in function signatures.
//!
//! Paths, references, raw pointers, slices, arrays, tuples and generic
//! instantiations are rendered in canonical spacing. Anything else (function
//! pointer types, multi-bound trait objects, macros) is an
//! [`LocateError::UnsupportedType`].

use crate::error::LocateError;
use crate::error::LocateResult;
use tree_sitter::Node;

/// Render a type node to its canonical text form
pub fn render_type(node: Node<'_>, source: &[u8]) -> LocateResult<String> {
    match node.kind() {
        "primitive_type" | "type_identifier" | "scoped_type_identifier" | "scoped_identifier" => {
            Ok(node_text(node, source)?.to_string())
        }
        "unit_type" => Ok("()".to_string()),
        "never_type" => Ok("!".to_string()),
        "reference_type" => {
            let mut out = String::from("&");
            if let Some(lifetime) = first_child_of_kind(node, "lifetime") {
                out.push_str(node_text(lifetime, source)?);
                out.push(' ');
            }
            if first_child_of_kind(node, "mutable_specifier").is_some() {
                out.push_str("mut ");
            }
            out.push_str(&render_type(required_field(node, "type", source)?, source)?);
            Ok(out)
        }
        "pointer_type" => {
            let qualifier = if first_child_of_kind(node, "mutable_specifier").is_some() {
                "*mut "
            } else {
                "*const "
            };
            let inner = render_type(required_field(node, "type", source)?, source)?;
            Ok(format!("{qualifier}{inner}"))
        }
        "array_type" => {
            let element = render_type(required_field(node, "element", source)?, source)?;
            match node.child_by_field_name("length") {
                Some(length) => Ok(format!("[{element}; {}]", node_text(length, source)?)),
                None => Ok(format!("[{element}]")),
            }
        }
        "tuple_type" => {
            let mut cursor = node.walk();
            let elements = node
                .named_children(&mut cursor)
                .map(|child| render_type(child, source))
                .collect::<LocateResult<Vec<_>>>()?;
            if elements.len() == 1 {
                Ok(format!("({},)", elements[0]))
            } else {
                Ok(format!("({})", elements.join(", ")))
            }
        }
        "generic_type" => {
            let base = render_type(required_field(node, "type", source)?, source)?;
            let arguments = required_field(node, "type_arguments", source)?;
            Ok(format!("{base}<{}>", render_type_arguments(arguments, source)?))
        }
        "dynamic_type" | "abstract_type" => {
            let keyword = if node.kind() == "dynamic_type" {
                "dyn"
            } else {
                "impl"
            };
            let bound = required_field(node, "trait", source)?;
            match bound.kind() {
                "type_identifier" | "scoped_type_identifier" | "generic_type" => {
                    Ok(format!("{keyword} {}", render_type(bound, source)?))
                }
                _ => Err(unsupported(node, source)),
            }
        }
        _ => Err(unsupported(node, source)),
    }
}

fn render_type_arguments(node: Node<'_>, source: &[u8]) -> LocateResult<String> {
    let mut cursor = node.walk();
    let mut rendered = Vec::new();
    for child in node.named_children(&mut cursor) {
        let text = match child.kind() {
            "lifetime" | "integer_literal" | "boolean_literal" | "char_literal" => {
                node_text(child, source)?.to_string()
            }
            "type_binding" => {
                let name = node_text(required_field(child, "name", source)?, source)?;
                let ty = render_type(required_field(child, "type", source)?, source)?;
                format!("{name} = {ty}")
            }
            _ => render_type(child, source)?,
        };
        rendered.push(text);
    }
    Ok(rendered.join(", "))
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> LocateResult<&'s str> {
    node.utf8_text(source).map_err(|e| LocateError::UnsupportedType {
        kind: node.kind().to_string(),
        text: e.to_string(),
    })
}

pub(crate) fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

fn required_field<'t>(node: Node<'t>, field: &str, source: &[u8]) -> LocateResult<Node<'t>> {
    node.child_by_field_name(field)
        .ok_or_else(|| unsupported(node, source))
}

fn unsupported(node: Node<'_>, source: &[u8]) -> LocateError {
    LocateError::UnsupportedType {
        kind: node.kind().to_string(),
        text: node.utf8_text(source).unwrap_or_default().to_string(),
    }
}

//! Core types for located declarations

use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use tree_sitter::Tree;

/// Parsed source file with its syntax tree
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub path: PathBuf,
    pub tree: Tree,
    pub source: String,
}

impl ParsedSource {
    pub fn text(&self, start_byte: usize, end_byte: usize) -> Option<&str> {
        self.source.get(start_byte..end_byte)
    }
}

/// Declaration kind: free function, or method inside an `impl` or `trait` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Function,
    Method,
}

impl DeclKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
        }
    }
}

/// A parameter or result slot of a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Field {
    pub fn named(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ty: ty.into(),
        }
    }

    pub fn unnamed(ty: impl Into<String>) -> Self {
        Self {
            name: None,
            ty: ty.into(),
        }
    }
}

/// A located function or method with its verbatim source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeclKind,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    pub file: PathBuf,
    pub source: String,
    /// 1-based line: the call site once attached to a frame, the declaration otherwise
    pub line: usize,
}

impl Function {
    /// Entry carrying only identity, used when a lookup misses
    pub fn placeholder(name: impl Into<String>, file: impl Into<PathBuf>, line: usize) -> Self {
        let name = name.into();
        let kind = if name.contains("::") {
            DeclKind::Method
        } else {
            DeclKind::Function
        };
        Self {
            name,
            kind,
            params: Vec::new(),
            results: Vec::new(),
            file: file.into(),
            source: String::new(),
            line,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source.is_empty()
    }
}

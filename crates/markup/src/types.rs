//! Token and AST node models.
//!
//! Determinism contract:
//! - Attributes are stored in encounter order; no hash-based storage anywhere
//!   in the tree.
//! - Tokens are produced once by the tokenizer, consumed once by the tree
//!   builder, and never retained.
//! - The tree is a strict ownership DAG: each node exclusively owns its
//!   children and there are no back-pointers. Parent context, where a
//!   traversal needs it, is an explicit stack, never node state.

use crate::position::{SourceRange, Span};

/// Per-node grammar mode, decided once at construction time.
///
/// Lenient is the permissive HTML-like ruleset (case-insensitive names,
/// optional closes, boolean attributes). Strict is the XML-like ruleset
/// (exact-case matching, mandatory closes, no boolean attributes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Lenient,
    Strict,
}

/// Raw attribute as scanned from an open tag. Values are undecoded source
/// slices; the tree builder decodes character references against
/// `value_span` so reference diagnostics anchor at their own sub-range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagAttribute {
    pub name: String,
    pub name_span: Span,
    /// `None` is a boolean attribute (`disabled`), distinct from `Some("")`.
    pub value: Option<String>,
    /// Span of the raw value text, excluding quotes. Empty span when the
    /// attribute has no value.
    pub value_span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text run. `raw` marks raw-text element content, which is never
    /// entity-decoded.
    Text { text: String, raw: bool },
    OpenTag {
        name: String,
        attributes: Vec<TagAttribute>,
        self_closing: bool,
    },
    CloseTag { name: String },
    Comment { text: String },
    CData { text: String },
    ProcessingInstruction { target: String, data: String },
    Doctype { value: String },
}

/// One lexical unit with its source span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Decoded attribute as stored on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// `None` is a boolean attribute, distinct from `Some("")`. The
    /// distinction is load-bearing in strict mode, where boolean attributes
    /// are forbidden.
    pub value: Option<String>,
    pub range: SourceRange,
}

/// A namespace declaration made on one element. `None` prefix is the default
/// namespace (`xmlns="..."`). An empty URI un-declares the prefix for the
/// element's subtree.
pub type NamespaceDeclaration = (Option<String>, String);

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Owns the whole tree; sole entry/exit point of the parse stage.
    Root {
        children: Vec<Node>,
        range: SourceRange,
    },
    Element {
        /// Raw name as written, possibly colon-qualified.
        name: String,
        prefix: Option<String>,
        local_name: String,
        mode: Mode,
        attributes: Vec<Attribute>,
        /// Declarations made *on* this element only, in source order; the
        /// effective scope is always resolved by walking ancestors.
        /// Never mutated after the open tag is fully parsed.
        namespace_declarations: Vec<NamespaceDeclaration>,
        self_closing: bool,
        /// True when the element can never have children: an HTML void tag in
        /// lenient mode, or a self-closed strict element.
        is_void: bool,
        children: Vec<Node>,
        range: SourceRange,
    },
    Text {
        text: String,
        mode: Mode,
        range: SourceRange,
    },
    Comment {
        text: String,
        mode: Mode,
        range: SourceRange,
    },
    CData {
        text: String,
        mode: Mode,
        range: SourceRange,
    },
    ProcessingInstruction {
        target: String,
        data: String,
        mode: Mode,
        range: SourceRange,
    },
    Doctype {
        value: String,
        mode: Mode,
        range: SourceRange,
    },
}

impl Node {
    pub fn mode(&self) -> Mode {
        match self {
            Node::Root { .. } => Mode::Lenient,
            Node::Element { mode, .. }
            | Node::Text { mode, .. }
            | Node::Comment { mode, .. }
            | Node::CData { mode, .. }
            | Node::ProcessingInstruction { mode, .. }
            | Node::Doctype { mode, .. } => *mode,
        }
    }

    pub fn range(&self) -> SourceRange {
        match self {
            Node::Root { range, .. }
            | Node::Element { range, .. }
            | Node::Text { range, .. }
            | Node::Comment { range, .. }
            | Node::CData { range, .. }
            | Node::ProcessingInstruction { range, .. }
            | Node::Doctype { range, .. } => *range,
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root { children, .. } | Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root { children, .. } | Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn is_element_named(&self, target: &str) -> bool {
        matches!(self, Node::Element { name, mode, .. }
            if match mode {
                Mode::Lenient => name.eq_ignore_ascii_case(target),
                Mode::Strict => name == target,
            })
    }

    /// Structural equality ignoring source ranges. Used by round-trip tests;
    /// cheap enough to keep in the library since host tooling diffs trees too.
    pub fn structural_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Root { children: a, .. }, Node::Root { children: b, .. }) => {
                children_structural_eq(a, b)
            }
            (
                Node::Element {
                    name: an,
                    prefix: ap,
                    local_name: al,
                    mode: am,
                    attributes: aa,
                    namespace_declarations: and,
                    self_closing: asc,
                    is_void: av,
                    children: ac,
                    ..
                },
                Node::Element {
                    name: bn,
                    prefix: bp,
                    local_name: bl,
                    mode: bm,
                    attributes: ba,
                    namespace_declarations: bnd,
                    self_closing: bsc,
                    is_void: bv,
                    children: bc,
                    ..
                },
            ) => {
                an == bn
                    && ap == bp
                    && al == bl
                    && am == bm
                    && and == bnd
                    && asc == bsc
                    && av == bv
                    && aa.len() == ba.len()
                    && aa
                        .iter()
                        .zip(ba)
                        .all(|(x, y)| x.name == y.name && x.value == y.value)
                    && children_structural_eq(ac, bc)
            }
            (
                Node::Text { text: a, mode: am, .. },
                Node::Text { text: b, mode: bm, .. },
            ) => a == b && am == bm,
            (
                Node::Comment { text: a, mode: am, .. },
                Node::Comment { text: b, mode: bm, .. },
            ) => a == b && am == bm,
            (
                Node::CData { text: a, mode: am, .. },
                Node::CData { text: b, mode: bm, .. },
            ) => a == b && am == bm,
            (
                Node::ProcessingInstruction { target: at, data: ad, mode: am, .. },
                Node::ProcessingInstruction { target: bt, data: bd, mode: bm, .. },
            ) => at == bt && ad == bd && am == bm,
            (
                Node::Doctype { value: a, mode: am, .. },
                Node::Doctype { value: b, mode: bm, .. },
            ) => a == b && am == bm,
            _ => false,
        }
    }
}

fn children_structural_eq(a: &[Node], b: &[Node]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
}

/// Split a possibly colon-qualified name into `(prefix, local)`.
///
/// An empty prefix part (`:name`) counts as no prefix; the remaining text may
/// still contain colons, which the tree builder diagnoses separately.
pub fn split_qualified_name(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() => {
            (Some(prefix.to_string()), local.to_string())
        }
        Some((_, local)) => (None, local.to_string()),
        None => (None, name.to_string()),
    }
}

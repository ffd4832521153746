//! Dual-mode markup compiler.
//!
//! One document may mix HTML-style lenient markup with XML-style strict
//! markup; the rules switch per element. Colon-qualified names (and
//! everything inside an explicit `<xml>` region) parse under the strict
//! ruleset; everything else parses leniently with HTML5 optional-tag
//! heuristics.
//!
//! The pipeline is `parse` (tokenizer + tree builder) → `validate` →
//! `emit`/`emit_to_stream`, plus `format` for canonical markup output. Every
//! stage is total over arbitrary input: malformed documents degrade to
//! diagnostics plus a best-effort tree, never a panic.
//!
//! Each call owns its tree and diagnostics; nothing is retained between
//! calls, so independent documents can be processed on independent threads
//! with no coordination.

mod diag;
mod emitter;
mod entities;
mod formatter;
mod namespace;
mod position;
mod tokenizer;
mod tree_builder;
mod types;
mod validator;

pub use crate::diag::{codes, Diagnostic, Severity};
pub use crate::emitter::{
    emit, emit_to_stream, EmitOptions, EmitOutcome, PiMode, SourceMap, StrictStrategy,
};
pub use crate::formatter::{format, FormatOptions};
pub use crate::namespace::ns;
pub use crate::position::{LineIndex, Position, SourceRange, Span};
pub use crate::tokenizer::Tokenizer;
pub use crate::tree_builder::{parse, ParseOptions, ParseOutcome};
pub use crate::types::{
    Attribute, Mode, NamespaceDeclaration, Node, TagAttribute, Token, TokenKind,
};
pub use crate::validator::{validate, SchemaRule, ValidateOptions};

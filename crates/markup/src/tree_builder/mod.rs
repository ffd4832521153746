//! Tree builder: consumes the token stream and always produces a complete
//! tree plus diagnostics, for any input.
//!
//! Determinism contract:
//! - One left-to-right scan of the token stream, no backtracking.
//! - An explicit frame stack (never recursion), so deep nesting grows the
//!   heap, not the native call stack.
//! - Mode is decided once per element at open-tag time and carried as data.

mod normalize;
pub(crate) mod rules;
mod stack;

use std::collections::VecDeque;

use crate::diag::{codes, Diagnostic};
use crate::entities;
use crate::position::{LineIndex, SourceRange, Span};
use crate::tokenizer::Tokenizer;
use crate::types::{
    Attribute, Mode, NamespaceDeclaration, Node, TagAttribute, Token, TokenKind,
};
use stack::{Frame, OpenStack};

/// How many recently force-closed element names the stray-close recovery
/// remembers.
const RECENT_CLOSURE_CAPACITY: usize = 16;

#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes in lenient context.
    pub preserve_whitespace: bool,
    /// Parse as a fragment: skip document-shape normalization.
    pub fragment: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preserve_whitespace: false,
            fragment: false,
        }
    }
}

#[derive(Debug)]
pub struct ParseOutcome {
    pub root: Node,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a document. Total: returns a well-formed root for any input.
pub fn parse(source: &str, options: &ParseOptions) -> ParseOutcome {
    let index = LineIndex::new(source);
    let mut tokenizer = Tokenizer::new(source, &index);
    let mut builder = TreeBuilder::new(source, &index, options.clone());
    while let Some(token) = tokenizer.next_token() {
        builder.process(token);
    }
    let mut diagnostics = tokenizer.take_diagnostics();
    let (root, builder_diagnostics) = builder.finish();
    diagnostics.extend(builder_diagnostics);
    ParseOutcome { root, diagnostics }
}

struct TreeBuilder<'a> {
    index: &'a LineIndex,
    source_len: usize,
    options: ParseOptions,
    stack: OpenStack,
    diagnostics: Vec<Diagnostic>,
    /// Ring of recently force-closed element names (lower-cased), consulted
    /// by the stray inline-formatting close recovery.
    recent_forced: VecDeque<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &str, index: &'a LineIndex, options: ParseOptions) -> Self {
        Self {
            index,
            source_len: source.len(),
            options,
            stack: OpenStack::default(),
            diagnostics: Vec::new(),
            recent_forced: VecDeque::with_capacity(RECENT_CLOSURE_CAPACITY),
        }
    }

    fn context_mode(&self) -> Mode {
        self.stack.top().map_or(Mode::Lenient, |frame| frame.mode)
    }

    fn process(&mut self, token: Token) {
        let range = self.index.resolve(token.span);
        match token.kind {
            TokenKind::Text { text, raw } => self.handle_text(text, raw, token.span, range),
            TokenKind::OpenTag {
                name,
                attributes,
                self_closing,
            } => self.handle_open_tag(name, attributes, self_closing, token.span, range),
            TokenKind::CloseTag { name } => self.handle_close_tag(name, range),
            TokenKind::Comment { text } => self.stack.append(Node::Comment {
                text,
                mode: self.context_mode(),
                range,
            }),
            TokenKind::CData { text } => self.stack.append(Node::CData {
                text,
                mode: self.context_mode(),
                range,
            }),
            TokenKind::ProcessingInstruction { target, data } => {
                self.stack.append(Node::ProcessingInstruction {
                    target,
                    data,
                    mode: self.context_mode(),
                    range,
                })
            }
            TokenKind::Doctype { value } => self.stack.append(Node::Doctype {
                value,
                mode: self.context_mode(),
                range,
            }),
        }
    }

    fn handle_text(&mut self, text: String, raw: bool, span: Span, range: SourceRange) {
        let mode = self.context_mode();
        let decoded = if raw {
            text
        } else {
            entities::decode(&text, span.start, self.index, &mut self.diagnostics)
        };
        if decoded.is_empty() {
            return;
        }
        if !raw
            && mode == Mode::Lenient
            && !self.options.preserve_whitespace
            && decoded.bytes().all(|b| b.is_ascii_whitespace())
        {
            return;
        }
        self.stack.append(Node::Text {
            text: decoded,
            mode,
            range,
        });
    }

    fn handle_open_tag(
        &mut self,
        name: String,
        attributes: Vec<TagAttribute>,
        self_closing: bool,
        span: Span,
        range: SourceRange,
    ) {
        let lower = name.to_ascii_lowercase();
        let colon_count = name.bytes().filter(|&b| b == b':').count();
        if colon_count > 1 {
            let name_start = span.start + 1;
            self.diagnostics.push(Diagnostic::error(
                codes::MULTI_COLON_NAME,
                format!("element name `{name}` contains more than one colon"),
                self.index.range(name_start, name_start + name.len()),
            ));
        }

        let in_region = self
            .stack
            .top()
            .is_some_and(|frame| frame.in_explicit_strict_region);
        let is_marker = colon_count == 0
            && lower == rules::MODE_SWITCH_MARKER
            && self.context_mode() == Mode::Lenient;
        let mode = if colon_count > 0 || in_region || is_marker {
            Mode::Strict
        } else {
            Mode::Lenient
        };
        let child_region = in_region || is_marker;

        let (prefix, local_name) = crate::types::split_qualified_name(&name);
        let (decoded_attributes, namespace_declarations) = self.decode_attributes(attributes);

        if mode == Mode::Lenient {
            self.run_auto_close_walk(&lower, range.start);
            self.maybe_imply_colgroup(&lower, range.start);
        }

        let is_void = match mode {
            Mode::Lenient => rules::is_void_element(&lower),
            Mode::Strict => self_closing,
        };

        if is_void {
            self.stack.append(Node::Element {
                name,
                prefix,
                local_name,
                mode,
                attributes: decoded_attributes,
                namespace_declarations,
                self_closing,
                is_void: true,
                children: Vec::new(),
                range,
            });
            return;
        }

        self.stack.push(Frame {
            name,
            prefix,
            local_name,
            lower_name: lower,
            mode,
            attributes: decoded_attributes,
            namespace_declarations,
            in_explicit_strict_region: child_region,
            children: Vec::new(),
            start: range.start,
            open_end: range.end,
        });
    }

    /// Decode attribute values and extract `xmlns` / `xmlns:PREFIX`
    /// declarations. Declarations stay in the attribute list too so that
    /// passthrough emission and round-trips keep the source shape.
    fn decode_attributes(
        &mut self,
        attributes: Vec<TagAttribute>,
    ) -> (Vec<Attribute>, Vec<NamespaceDeclaration>) {
        let mut decoded_attributes = Vec::with_capacity(attributes.len());
        let mut declarations: Vec<NamespaceDeclaration> = Vec::new();
        for attribute in attributes {
            let decoded = attribute.value.as_ref().map(|raw| {
                entities::decode(
                    raw,
                    attribute.value_span.start,
                    self.index,
                    &mut self.diagnostics,
                )
            });
            if attribute.name == "xmlns" {
                declarations.push((None, decoded.clone().unwrap_or_default()));
            } else if let Some(declared_prefix) = attribute.name.strip_prefix("xmlns:") {
                declarations.push((
                    Some(declared_prefix.to_string()),
                    decoded.clone().unwrap_or_default(),
                ));
            }
            let end_offset = attribute.value_span.end.max(attribute.name_span.end);
            decoded_attributes.push(Attribute {
                name: attribute.name,
                value: decoded,
                range: self.index.range(attribute.name_span.start, end_offset),
            });
        }
        (decoded_attributes, declarations)
    }

    /// The lenient auto-close walk. Strict frames are a visibility wall:
    /// lenient ancestors beyond one are protected from content inside the
    /// strict region.
    fn run_auto_close_walk(&mut self, incoming_lower: &str, at: crate::position::Position) {
        loop {
            let mut close_from = None;
            for idx in (0..self.stack.depth()).rev() {
                let frame = &self.stack.frames()[idx];
                if frame.mode == Mode::Strict {
                    break;
                }
                if rules::closes_on_open(&frame.lower_name, incoming_lower) {
                    close_from = Some(idx);
                    break;
                }
            }
            let Some(idx) = close_from else {
                return;
            };
            log::trace!(
                target: "markup.tree_builder",
                "auto-close of {} frame(s) triggered by <{incoming_lower}>",
                self.stack.depth() - idx
            );
            while self.stack.depth() > idx {
                self.stack.close_top(at);
            }
        }
    }

    /// `<col>` directly inside a lenient `<table>` gets an implied
    /// `<colgroup>` container.
    fn maybe_imply_colgroup(&mut self, incoming_lower: &str, at: crate::position::Position) {
        if incoming_lower != "col" {
            return;
        }
        let table_on_top = self
            .stack
            .top()
            .is_some_and(|frame| frame.mode == Mode::Lenient && frame.lower_name == "table");
        if !table_on_top {
            return;
        }
        self.stack.push(Frame {
            name: "colgroup".to_string(),
            prefix: None,
            local_name: "colgroup".to_string(),
            lower_name: "colgroup".to_string(),
            mode: Mode::Lenient,
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
            in_explicit_strict_region: false,
            children: Vec::new(),
            start: at,
            open_end: at,
        });
    }

    fn handle_close_tag(&mut self, name: String, range: SourceRange) {
        let lower = name.to_ascii_lowercase();
        let colon_qualified = name.contains(':');

        let matched = (0..self.stack.depth()).rev().find(|&idx| {
            let frame = &self.stack.frames()[idx];
            if colon_qualified {
                frame.name == name
            } else {
                frame.name.eq_ignore_ascii_case(&name)
            }
        });

        let Some(idx) = matched else {
            self.recover_stray_close(&name, &lower, colon_qualified, range);
            return;
        };

        // Force-close everything above the match.
        while self.stack.depth() > idx + 1 {
            let frame = self.stack.top().expect("frames above the match");
            let lower_name = frame.lower_name.clone();
            if frame.mode == Mode::Strict {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::UNCLOSED_ELEMENT,
                        format!("strict element <{}> is never explicitly closed", frame.name),
                        SourceRange::new(frame.start, frame.open_end),
                    )
                    .with_hint(format!("closed implicitly by </{name}>")),
                );
            }
            self.remember_forced_close(lower_name);
            self.stack.close_top(range.start);
        }

        let top = self.stack.top().expect("matched frame");
        if top.mode == Mode::Strict && top.name != name {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::STRICT_CASE_MISMATCH,
                    format!("closing tag </{name}> does not match <{}> exactly", top.name),
                    range,
                )
                .with_hint(format!("write </{}>", top.name)),
            );
        }
        self.stack.close_top(range.end);
    }

    fn remember_forced_close(&mut self, lower_name: String) {
        if self.recent_forced.len() == RECENT_CLOSURE_CAPACITY {
            self.recent_forced.pop_front();
        }
        self.recent_forced.push_back(lower_name);
    }

    /// No open element matches this close tag. Misnested inline formatting
    /// (`<b><i>x</b></i>`) resolves silently against the recent-closure ring;
    /// anything else is diagnosed, with a spelling hint when a currently open
    /// name is within edit distance 2.
    fn recover_stray_close(
        &mut self,
        name: &str,
        lower: &str,
        colon_qualified: bool,
        range: SourceRange,
    ) {
        if rules::is_formatting_recovery_name(lower) {
            if let Some(pos) = self.recent_forced.iter().position(|n| n == lower) {
                self.recent_forced.remove(pos);
                log::trace!(
                    target: "markup.tree_builder",
                    "stray </{name}> resolved against recent forced closure"
                );
                return;
            }
        }

        let mut best: Option<(usize, &str)> = None;
        for frame in self.stack.frames().iter().rev() {
            let distance = if colon_qualified || frame.mode == Mode::Strict {
                levenshtein(name, &frame.name)
            } else {
                levenshtein(lower, &frame.lower_name)
            };
            if distance <= 2 && best.is_none_or(|(best_distance, _)| distance < best_distance) {
                best = Some((distance, frame.name.as_str()));
            }
        }
        let mut diagnostic = Diagnostic::error(
            codes::UNMATCHED_CLOSE_TAG,
            format!("unmatched closing tag </{name}>"),
            range,
        );
        if let Some((_, suggestion)) = best {
            diagnostic = diagnostic.with_hint(format!("did you mean </{suggestion}>?"));
        }
        self.diagnostics.push(diagnostic);
    }

    fn finish(mut self) -> (Node, Vec<Diagnostic>) {
        // Open strict elements at EOF are errors; lenient ones close silently.
        for frame in self.stack.frames().iter().rev() {
            if frame.mode == Mode::Strict {
                self.diagnostics.push(Diagnostic::error(
                    codes::ELEMENT_NEVER_CLOSED,
                    format!("strict element <{}> is never closed", frame.name),
                    SourceRange::new(frame.start, frame.open_end),
                ));
            }
        }
        let end = self.index.position_at(self.source_len);
        let mut children = self.stack.into_root_children(end);
        if !self.options.fragment {
            children = normalize::normalize_document(children);
        }
        let root = Node::Root {
            children,
            range: self.index.range(0, self.source_len),
        };
        (root, self.diagnostics)
    }
}

/// Classic two-row edit distance; names are short so this stays cheap.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

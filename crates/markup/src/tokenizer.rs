//! Hand-rolled byte-level tokenizer.
//!
//! Supported tag-name characters (ASCII only): start `[A-Za-z_]`, then
//! `[A-Za-z0-9:_-]`. Attribute names use the same ASCII character class plus
//! anything that is not structural (`=`, `>`, `/`, quotes, whitespace).
//!
//! Invariants:
//! - One token per `next_token` call; raw-text content is queued so the call
//!   that scanned it still returns only the open tag.
//! - Lazy iteration and `tokenize_all` produce identical token sequences and
//!   diagnostics for the same input.
//! - The tokenizer never panics on document content: every malformed
//!   construct degrades to a best-effort token plus a diagnostic.
//! - We scan by byte, but slice endpoints are always UTF-8 char boundaries:
//!   cuts happen only at ASCII structural bytes or positions reached by
//!   scanning ASCII token characters.

use crate::diag::{codes, Diagnostic};
use crate::position::{LineIndex, Span};
use crate::types::{TagAttribute, Token, TokenKind};
use memchr::memchr;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const DOCTYPE_KEYWORD: &[u8] = b"<!doctype";
const PI_CLOSE: &str = "?>";

/// Elements whose content is scanned as literal text (unprefixed names only).
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script")
        || name.eq_ignore_ascii_case("style")
        || name.eq_ignore_ascii_case("textarea")
        || name.eq_ignore_ascii_case("title")
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// Find the start of a case-insensitive `</name` whose next character is `>`,
/// whitespace, or EOF. Returns the byte offset of the `<`.
fn find_raw_text_close(haystack: &[u8], name: &str) -> Option<usize> {
    let name = name.as_bytes();
    debug_assert!(name.is_ascii());
    let mut i = 0;
    while i < haystack.len() {
        let rel = memchr(b'<', &haystack[i..])?;
        i += rel;
        if i + 1 < haystack.len()
            && haystack[i + 1] == b'/'
            && starts_with_ignore_ascii_case_at(haystack, i + 2, name)
        {
            let after = i + 2 + name.len();
            if after >= haystack.len()
                || haystack[after] == b'>'
                || haystack[after].is_ascii_whitespace()
            {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Byte-level scanner over one in-memory document.
///
/// Diagnostics accumulate in an append-only list available both during and
/// after scanning.
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    index: &'a LineIndex,
    pos: usize,
    queued: Option<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, index: &'a LineIndex) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            index,
            pos: 0,
            queued: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Scan the whole source eagerly.
    pub fn tokenize_all(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        (tokens, self.diagnostics)
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(queued) = self.queued.take() {
            return Some(queued);
        }
        let len = self.bytes.len();
        if self.pos >= len {
            return None;
        }

        if self.bytes[self.pos] != b'<' {
            return Some(self.scan_text(self.pos));
        }

        let i = self.pos;
        if self.source[i..].starts_with(COMMENT_OPEN) {
            return Some(self.scan_comment(i));
        }
        if self.source[i..].starts_with(CDATA_OPEN) {
            return Some(self.scan_cdata(i));
        }
        if starts_with_ignore_ascii_case_at(self.bytes, i, DOCTYPE_KEYWORD) {
            return Some(self.scan_doctype(i));
        }
        if i + 1 < len && self.bytes[i + 1] == b'!' {
            return Some(self.scan_malformed_declaration(i));
        }
        if i + 1 < len && self.bytes[i + 1] == b'?' {
            return Some(self.scan_processing_instruction(i));
        }
        if i + 2 < len && self.bytes[i + 1] == b'/' && is_name_start(self.bytes[i + 2]) {
            return Some(self.scan_close_tag(i));
        }
        if i + 1 < len && is_name_start(self.bytes[i + 1]) {
            return Some(self.scan_open_tag(i));
        }

        // Bare `<` (or `</` without a name): literal text up to the next `<`.
        Some(self.scan_text_from_angle(i))
    }

    fn scan_text(&mut self, start: usize) -> Token {
        debug_assert!(self.source.is_char_boundary(start));
        let rel = memchr(b'<', &self.bytes[start..]);
        let end = rel.map_or(self.bytes.len(), |r| start + r);
        debug_assert!(self.source.is_char_boundary(end));
        self.pos = end;
        Token {
            kind: TokenKind::Text {
                text: self.source[start..end].to_string(),
                raw: false,
            },
            span: Span::new(start, end),
        }
    }

    /// Text run that begins with a literal `<`: skip past it before searching
    /// for the next `<` so the angle bracket itself lands in the text.
    fn scan_text_from_angle(&mut self, start: usize) -> Token {
        let search_from = start + 1;
        let end = if search_from >= self.bytes.len() {
            self.bytes.len()
        } else {
            memchr(b'<', &self.bytes[search_from..]).map_or(self.bytes.len(), |r| search_from + r)
        };
        self.pos = end;
        Token {
            kind: TokenKind::Text {
                text: self.source[start..end].to_string(),
                raw: false,
            },
            span: Span::new(start, end),
        }
    }

    fn scan_comment(&mut self, start: usize) -> Token {
        let body_start = start + COMMENT_OPEN.len();
        match self.source[body_start..].find(COMMENT_CLOSE) {
            Some(rel) => {
                let body_end = body_start + rel;
                let end = body_end + COMMENT_CLOSE.len();
                self.pos = end;
                Token {
                    kind: TokenKind::Comment {
                        text: self.source[body_start..body_end].to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
            None => {
                let end = self.bytes.len();
                self.diagnostics.push(Diagnostic::error(
                    codes::UNTERMINATED_COMMENT,
                    "comment is never terminated; expected `-->`",
                    self.index.range(start, end),
                ));
                self.pos = end;
                Token {
                    kind: TokenKind::Comment {
                        text: self.source[body_start..end].to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
        }
    }

    fn scan_cdata(&mut self, start: usize) -> Token {
        let body_start = start + CDATA_OPEN.len();
        match self.source[body_start..].find(CDATA_CLOSE) {
            Some(rel) => {
                let body_end = body_start + rel;
                let end = body_end + CDATA_CLOSE.len();
                self.pos = end;
                Token {
                    kind: TokenKind::CData {
                        text: self.source[body_start..body_end].to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
            None => {
                let end = self.bytes.len();
                self.diagnostics.push(Diagnostic::error(
                    codes::UNTERMINATED_CDATA,
                    "CDATA section is never terminated; expected `]]>`",
                    self.index.range(start, end),
                ));
                self.pos = end;
                Token {
                    kind: TokenKind::CData {
                        text: self.source[body_start..end].to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
        }
    }

    fn scan_doctype(&mut self, start: usize) -> Token {
        let value_start = start + DOCTYPE_KEYWORD.len();
        let (value_end, end) = match memchr(b'>', &self.bytes[value_start..]) {
            Some(rel) => (value_start + rel, value_start + rel + 1),
            None => (self.bytes.len(), self.bytes.len()),
        };
        self.pos = end;
        Token {
            kind: TokenKind::Doctype {
                value: self.source[value_start..value_end].trim().to_string(),
            },
            span: Span::new(start, end),
        }
    }

    /// Any `<!...>` that is not a comment, CDATA section, or doctype.
    /// Consumed through the next `>`; contributes an empty text token so the
    /// stream stays position-contiguous.
    fn scan_malformed_declaration(&mut self, start: usize) -> Token {
        let end = match memchr(b'>', &self.bytes[start..]) {
            Some(rel) => start + rel + 1,
            None => self.bytes.len(),
        };
        self.diagnostics.push(Diagnostic::error(
            codes::MALFORMED_DECLARATION,
            "unrecognised markup declaration",
            self.index.range(start, end),
        ));
        self.pos = end;
        Token {
            kind: TokenKind::Text {
                text: String::new(),
                raw: false,
            },
            span: Span::new(start, end),
        }
    }

    fn scan_processing_instruction(&mut self, start: usize) -> Token {
        let len = self.bytes.len();
        let mut j = start + 2;
        let target_start = j;
        while j < len && is_name_char(self.bytes[j]) {
            j += 1;
        }
        let target = self.source[target_start..j].to_string();
        // Data begins after the whitespace separating it from the target.
        while j < len && self.bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let data_start = j;
        match self.source[data_start..].find(PI_CLOSE) {
            Some(rel) => {
                let data_end = data_start + rel;
                let end = data_end + PI_CLOSE.len();
                self.pos = end;
                Token {
                    kind: TokenKind::ProcessingInstruction {
                        target,
                        data: self.source[data_start..data_end].trim_end().to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
            None => {
                let end = len;
                self.diagnostics.push(Diagnostic::error(
                    codes::UNTERMINATED_PI,
                    "processing instruction is never terminated; expected `?>`",
                    self.index.range(start, end),
                ));
                self.pos = end;
                Token {
                    kind: TokenKind::ProcessingInstruction {
                        target,
                        data: self.source[data_start..end].trim_end().to_string(),
                    },
                    span: Span::new(start, end),
                }
            }
        }
    }

    fn scan_close_tag(&mut self, start: usize) -> Token {
        let len = self.bytes.len();
        let name_start = start + 2;
        let mut j = name_start;
        while j < len && is_name_char(self.bytes[j]) {
            j += 1;
        }
        let name = self.source[name_start..j].to_string();
        // Skip any junk between the name and `>`.
        while j < len && self.bytes[j] != b'>' {
            j += 1;
        }
        if j < len {
            j += 1;
        }
        self.pos = j;
        Token {
            kind: TokenKind::CloseTag { name },
            span: Span::new(start, j),
        }
    }

    fn scan_open_tag(&mut self, start: usize) -> Token {
        let len = self.bytes.len();
        let name_start = start + 1;
        let mut k = name_start;
        while k < len && is_name_char(self.bytes[k]) {
            k += 1;
        }
        let name = self.source[name_start..k].to_string();
        let mut attributes: Vec<TagAttribute> = Vec::new();
        let mut self_closing = false;

        loop {
            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            if self.bytes[k] == b'>' {
                k += 1;
                break;
            }
            if self.bytes[k] == b'/' {
                if k + 1 < len && self.bytes[k + 1] == b'>' {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }

            let attr_start = k;
            while k < len && !self.is_attr_name_end(k) {
                k += 1;
            }
            if attr_start == k {
                // Not a name character at all; skip it so we make progress.
                k += 1;
                continue;
            }
            debug_assert!(self.source.is_char_boundary(attr_start));
            debug_assert!(self.source.is_char_boundary(k));
            let attr_name = self.source[attr_start..k].to_string();
            let name_span = Span::new(attr_start, k);

            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }

            if k < len && self.bytes[k] == b'=' {
                k += 1;
                while k < len && self.bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                let (value, value_span, next) = self.scan_attr_value(k);
                attributes.push(TagAttribute {
                    name: attr_name,
                    name_span,
                    value: Some(value),
                    value_span,
                });
                k = next;
            } else {
                attributes.push(TagAttribute {
                    name: attr_name,
                    name_span,
                    value: None,
                    value_span: Span::new(k, k),
                });
            }
        }

        self.pos = k;
        let token = Token {
            kind: TokenKind::OpenTag {
                name: name.clone(),
                attributes,
                self_closing,
            },
            span: Span::new(start, k),
        };

        if !self_closing && !name.contains(':') && is_raw_text_element(&name) {
            self.queue_raw_text(&name, k);
        }
        token
    }

    fn is_attr_name_end(&self, k: usize) -> bool {
        let b = self.bytes[k];
        b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/' || b == b'"' || b == b'\''
    }

    /// Scan one attribute value starting at `k` (after `=` and whitespace).
    /// Returns the raw value, its span (quotes excluded), and the resume
    /// position.
    fn scan_attr_value(&mut self, k: usize) -> (String, Span, usize) {
        let len = self.bytes.len();
        if k < len && (self.bytes[k] == b'"' || self.bytes[k] == b'\'') {
            let quote = self.bytes[k];
            let vstart = k + 1;
            let mut j = vstart;
            while j < len && self.bytes[j] != quote && self.bytes[j] != b'\n' {
                j += 1;
            }
            if j < len && self.bytes[j] == quote {
                return (self.source[vstart..j].to_string(), Span::new(vstart, j), j + 1);
            }
            // Raw newline or EOF inside a quoted value: do not swallow the
            // rest of the document; the value ends here and scanning resumes
            // after the newline.
            self.diagnostics.push(Diagnostic::error(
                codes::UNTERMINATED_ATTRIBUTE,
                format!(
                    "attribute value is missing its closing `{}` quote",
                    quote as char
                ),
                self.index.range(k, j),
            ));
            let resume = if j < len { j + 1 } else { j };
            return (self.source[vstart..j].to_string(), Span::new(vstart, j), resume);
        }

        let vstart = k;
        let mut j = k;
        while j < len
            && !self.bytes[j].is_ascii_whitespace()
            && self.bytes[j] != b'>'
            && self.bytes[j] != b'/'
        {
            j += 1;
        }
        (self.source[vstart..j].to_string(), Span::new(vstart, j), j)
    }

    /// Queue the literal content of a raw-text element. The queued token is
    /// returned by the next `next_token` call; scanning then resumes at the
    /// close tag (tokenized as an ordinary close tag) or EOF.
    fn queue_raw_text(&mut self, name: &str, content_start: usize) {
        let close_start = find_raw_text_close(&self.bytes[content_start..], name)
            .map(|rel| content_start + rel)
            .unwrap_or(self.bytes.len());
        log::trace!(
            target: "markup.tokenizer",
            "raw text element <{name}>: content {content_start}..{close_start}"
        );
        if close_start > content_start {
            self.queued = Some(Token {
                kind: TokenKind::Text {
                    text: self.source[content_start..close_start].to_string(),
                    raw: true,
                },
                span: Span::new(content_start, close_start),
            });
        }
        self.pos = close_start.max(self.pos);
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

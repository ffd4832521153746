//! Document formatter: parses markup and renders it back as canonical
//! markup (not HTML).
//!
//! Canonical form: lenient names lower-cased, explicit close tags, quoted
//! attribute values, block children one per indented line with surrounding
//! whitespace collapsed. Formatting is idempotent: formatting its own output
//! reproduces it byte for byte.

use crate::diag::Diagnostic;
use crate::tokenizer::is_raw_text_element;
use crate::tree_builder::{parse, rules, ParseOptions};
use crate::types::{Attribute, Mode, Node};

#[derive(Clone, Debug)]
pub struct FormatOptions {
    pub indent: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

/// Parse `source` and render it back as formatted markup. Parse diagnostics
/// are returned alongside; the formatter itself adds none.
pub fn format(source: &str, options: &FormatOptions) -> (String, Vec<Diagnostic>) {
    let outcome = parse(
        source,
        &ParseOptions {
            fragment: true,
            ..ParseOptions::default()
        },
    );
    let mut output = String::new();
    let formatter = Formatter { options };
    formatter.render_list(
        outcome.root.children().unwrap_or(&[]),
        &mut output,
        0,
        false,
    );
    (output, outcome.diagnostics)
}

struct Formatter<'a> {
    options: &'a FormatOptions,
}

impl Formatter<'_> {
    fn render_list(&self, children: &[Node], out: &mut String, depth: usize, flat: bool) {
        let flat = flat
            || self.options.indent.is_empty()
            || !children.iter().any(forces_block);
        if flat {
            for child in children {
                self.render_node(child, out, depth, true);
            }
            return;
        }
        for child in children {
            match child {
                Node::Text { text, .. } => {
                    for line in text.lines() {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        self.push_indent(out, depth);
                        out.push_str(&escape_text(trimmed));
                        out.push('\n');
                    }
                }
                _ => {
                    self.push_indent(out, depth);
                    self.render_node(child, out, depth, false);
                    out.push('\n');
                }
            }
        }
    }

    fn render_node(&self, node: &Node, out: &mut String, depth: usize, flat: bool) {
        match node {
            Node::Root { children, .. } => self.render_list(children, out, depth, flat),
            Node::Element { .. } => self.render_element(node, out, depth, flat),
            Node::Text { text, .. } => out.push_str(&escape_text(text)),
            Node::Comment { text, .. } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Node::CData { text, .. } => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            Node::ProcessingInstruction { target, data, .. } => {
                out.push_str("<?");
                out.push_str(target);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            Node::Doctype { value, .. } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(value);
                out.push('>');
            }
        }
    }

    fn render_element(&self, node: &Node, out: &mut String, depth: usize, flat: bool) {
        let Node::Element {
            name,
            mode,
            attributes,
            is_void,
            children,
            ..
        } = node
        else {
            return;
        };
        let lenient = *mode == Mode::Lenient;
        let tag = if lenient {
            name.to_ascii_lowercase()
        } else {
            name.clone()
        };

        out.push('<');
        out.push_str(&tag);
        for attribute in attributes {
            self.render_attribute(attribute, lenient, out);
        }

        if *is_void {
            if lenient {
                out.push('>');
            } else {
                out.push_str("/>");
            }
            return;
        }
        out.push('>');

        if lenient && is_raw_text_element(&tag) {
            for child in children {
                if let Node::Text { text, .. } = child {
                    out.push_str(text);
                }
            }
        } else {
            let block = !flat
                && !self.options.indent.is_empty()
                && children.iter().any(forces_block);
            if block {
                out.push('\n');
                self.render_list(children, out, depth + 1, false);
                self.push_indent(out, depth);
            } else {
                self.render_list(children, out, depth, true);
            }
        }

        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }

    fn render_attribute(&self, attribute: &Attribute, lenient: bool, out: &mut String) {
        out.push(' ');
        if lenient {
            out.push_str(&attribute.name.to_ascii_lowercase());
        } else {
            out.push_str(&attribute.name);
        }
        if let Some(value) = &attribute.value {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }

    fn push_indent(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(&self.options.indent);
        }
    }
}

fn forces_block(node: &Node) -> bool {
    match node {
        Node::Text { text, .. } => text.contains('\n'),
        Node::Element {
            mode: Mode::Lenient,
            name,
            ..
        } => rules::is_block_level(&name.to_ascii_lowercase()),
        // Strict structures with line-broken content format as blocks too.
        Node::Element {
            mode: Mode::Strict,
            children,
            ..
        } => children.iter().any(forces_block),
        _ => false,
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Quoted markup attribute values must not contain raw quotes or newlines;
/// the tokenizer treats a raw newline as an unterminated value.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_default(source: &str) -> String {
        format(source, &FormatOptions::default()).0
    }

    #[test]
    fn canonicalizes_lenient_case_and_closes_tags() {
        assert_eq!(
            format_default("<DIV Class=\"a\">x</DIV>"),
            "<div class=\"a\">x</div>\n"
        );
    }

    #[test]
    fn supplies_omitted_close_tags() {
        assert_eq!(
            format_default("<ul><li>One<li>Two</ul>"),
            "<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>\n"
        );
    }

    #[test]
    fn strict_names_keep_their_case() {
        assert_eq!(
            format_default("<data:Rec f=\"1\"/>"),
            "<data:Rec f=\"1\"/>"
        );
    }

    #[test]
    fn lenient_void_elements_have_no_slash() {
        assert_eq!(format_default("<br><hr>"), "<br><hr>");
    }

    #[test]
    fn formatting_is_idempotent_on_mixed_documents() {
        let sources = [
            "<ul><li>One<li>Two<li>Three</ul>",
            "<DIV>text<p>para</DIV>",
            "<data:r xmlns:data=\"urn:d\"><data:f>1</data:f></data:r>",
            "<xml><row><cell>a</cell></row></xml>",
            "<script>let x = 1 < 2;</script>",
            "<!-- note --><p>a &amp; b</p>",
            "<table><col><tr><td>x</table>",
            "text only",
            "",
        ];
        for source in sources {
            let once = format_default(source);
            let twice = format_default(&once);
            assert_eq!(once, twice, "formatting is not idempotent for {source:?}");
        }
    }

    #[test]
    fn attribute_newlines_are_escaped_for_reparse() {
        let (once, _) = format("<data:a xmlns:data=\"urn:d\" v=\"a&#10;b\"/>", &FormatOptions::default());
        assert_eq!(once, "<data:a xmlns:data=\"urn:d\" v=\"a&#10;b\"/>");
        let (twice, diagnostics) = format(&once, &FormatOptions::default());
        assert_eq!(once, twice);
        assert!(diagnostics.is_empty(), "got: {diagnostics:?}");
    }

    #[test]
    fn raw_text_content_is_untouched() {
        assert_eq!(
            format_default("<style>a > b { c: d; }</style>"),
            "<style>a > b { c: d; }</style>"
        );
    }

    #[test]
    fn flat_formatting_with_empty_indent() {
        let options = FormatOptions {
            indent: String::new(),
        };
        let (output, _) = format("<ul><li>One<li>Two</ul>", &options);
        assert_eq!(output, "<ul><li>One</li><li>Two</li></ul>");
    }
}

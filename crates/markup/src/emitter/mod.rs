//! Tree-to-HTML serialization.
//!
//! One entry point, four strict-element strategies dispatched by a closed
//! enum. The buffered form is implemented on top of the streaming form, so
//! both produce byte-identical output by construction.

mod source_map;

pub use source_map::SourceMap;
use source_map::SourceMapBuilder;

use crate::namespace;
use crate::position::Position;
use crate::tokenizer::is_raw_text_element;
use crate::tree_builder::rules;
use crate::types::{Attribute, Mode, NamespaceDeclaration, Node};

/// How strict-mode elements are transformed for HTML output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrictStrategy {
    /// Colon becomes a hyphen (optionally prefixed); foreign-content
    /// namespaces render under their bare local name.
    CustomTag,
    /// Wrapped in a generic container with `data-*` attributes.
    DataAttribute,
    /// Rendered with the original qualified name, unchanged.
    Passthrough,
    /// The element is omitted; its children render in place.
    Strip,
}

/// How processing instructions render. An `xml`-targeted instruction is
/// always suppressed regardless of this setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PiMode {
    Keep,
    Comment,
    Strip,
}

#[derive(Clone, Debug)]
pub struct EmitOptions {
    pub strategy: StrictStrategy,
    /// Indent unit; empty string disables pretty-printing entirely.
    pub indent: String,
    /// Prepend the standard `<!DOCTYPE html>` line (and skip doctype nodes in
    /// the tree so the output carries exactly one).
    pub doctype: bool,
    /// Prefix for custom-tag strategy names, e.g. `x-`.
    pub custom_element_prefix: String,
    pub processing_instruction_mode: PiMode,
    /// Render CDATA sections as neutralized comments; otherwise their content
    /// renders as escaped text.
    pub preserve_cdata_as_comment: bool,
    pub source_map: bool,
    /// Label recorded in the map's `sources` array.
    pub source_file: Option<String>,
    /// Original source embedded as `sourcesContent`.
    pub source_content: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            strategy: StrictStrategy::CustomTag,
            indent: String::new(),
            doctype: false,
            custom_element_prefix: String::new(),
            processing_instruction_mode: PiMode::Keep,
            preserve_cdata_as_comment: true,
            source_map: false,
            source_file: None,
            source_content: None,
        }
    }
}

#[derive(Debug)]
pub struct EmitOutcome {
    pub output: String,
    pub source_map: Option<SourceMap>,
}

/// Buffered emission.
pub fn emit(root: &Node, options: &EmitOptions) -> EmitOutcome {
    let mut output = String::new();
    let mut sink = |chunk: &str| output.push_str(chunk);
    let source_map = emit_to_stream(root, &mut sink, options);
    EmitOutcome { output, source_map }
}

/// Streaming emission: every chunk goes through `sink` in output order.
pub fn emit_to_stream(
    root: &Node,
    sink: &mut dyn FnMut(&str),
    options: &EmitOptions,
) -> Option<SourceMap> {
    let mut emitter = Emitter {
        sink,
        options,
        map: options.source_map.then(SourceMapBuilder::new),
        scopes: Vec::new(),
    };
    if options.doctype {
        emitter.write("<!DOCTYPE html>\n");
    }
    let children = root.children().unwrap_or(&[]);
    emitter.render_list(children, 0, false);
    emitter.map.take().map(|map| {
        map.finish(
            None,
            options.source_file.clone(),
            options.source_content.clone(),
        )
    })
}

struct Emitter<'a> {
    sink: &'a mut dyn FnMut(&str),
    options: &'a EmitOptions,
    map: Option<SourceMapBuilder>,
    scopes: Vec<&'a [NamespaceDeclaration]>,
}

impl<'a> Emitter<'a> {
    fn write(&mut self, text: &str) {
        if let Some(map) = &mut self.map {
            map.advance(text);
        }
        (self.sink)(text);
    }

    fn mark(&mut self, origin: Position) {
        if let Some(map) = &mut self.map {
            map.add_mapping(origin);
        }
    }

    fn write_indent(&mut self, depth: usize) {
        let unit: &'a str = self.options.indent.as_str();
        for _ in 0..depth {
            self.write(unit);
        }
    }

    /// Render a node list. `flat` forces single-line output (inherited once a
    /// list decides to render on one line, and always on when indent is
    /// empty).
    fn render_list(&mut self, children: &'a [Node], depth: usize, flat: bool) {
        let flat = flat
            || self.options.indent.is_empty()
            || !children.iter().any(|child| self.forces_block(child));
        if flat {
            for child in children {
                self.render_node(child, depth, true);
            }
            return;
        }
        for child in children {
            self.render_block_item(child, depth);
        }
    }

    /// One child on its own indented line (or several, for multi-line text
    /// and stripped elements).
    fn render_block_item(&mut self, child: &'a Node, depth: usize) {
        match child {
            Node::Text { text, range, .. } => {
                // Whitespace-only runs between block children collapse away;
                // other text is trimmed per line.
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.write_indent(depth);
                    self.mark(range.start);
                    let escaped = escape_text(trimmed);
                    self.write(&escaped);
                    self.write("\n");
                }
            }
            Node::Doctype { .. } if self.options.doctype => {}
            Node::Element {
                mode: Mode::Strict,
                namespace_declarations,
                children,
                ..
            } if self.options.strategy == StrictStrategy::Strip => {
                // Stripped elements dissolve into the surrounding block list,
                // but their declarations still scope their children.
                self.scopes.push(namespace_declarations);
                for inner in children {
                    self.render_block_item(inner, depth);
                }
                self.scopes.pop();
            }
            _ => {
                self.write_indent(depth);
                self.render_node(child, depth, false);
                self.write("\n");
            }
        }
    }

    /// Does this node force its parent list into block layout?
    fn forces_block(&self, node: &Node) -> bool {
        match node {
            Node::Text { text, .. } => text.contains('\n'),
            Node::Element {
                mode: Mode::Lenient,
                name,
                ..
            } => rules::is_block_level(&name.to_ascii_lowercase()),
            Node::Element {
                mode: Mode::Strict,
                children,
                ..
            } if self.options.strategy == StrictStrategy::Strip => {
                children.iter().any(|child| self.forces_block(child))
            }
            _ => false,
        }
    }

    fn render_node(&mut self, node: &'a Node, depth: usize, flat: bool) {
        match node {
            Node::Root { children, .. } => self.render_list(children, depth, flat),
            Node::Element { .. } => self.render_element(node, depth, flat),
            Node::Text { text, range, .. } => {
                self.mark(range.start);
                let escaped = escape_text(text);
                self.write(&escaped);
            }
            Node::Comment { text, range, .. } => {
                self.mark(range.start);
                let neutralized = neutralize(text, "--", "- -");
                self.write("<!--");
                self.write(&neutralized);
                self.write("-->");
            }
            Node::CData { text, range, .. } => {
                self.mark(range.start);
                if self.options.preserve_cdata_as_comment {
                    let neutralized = neutralize(text, "--", "- -");
                    self.write("<!--[CDATA[");
                    self.write(&neutralized);
                    self.write("]]-->");
                } else {
                    let escaped = escape_text(text);
                    self.write(&escaped);
                }
            }
            Node::ProcessingInstruction {
                target,
                data,
                range,
                ..
            } => {
                if target.eq_ignore_ascii_case("xml") {
                    return;
                }
                match self.options.processing_instruction_mode {
                    PiMode::Strip => {}
                    PiMode::Keep => {
                        self.mark(range.start);
                        let safe = neutralize(data, "?>", "? >");
                        self.write("<?");
                        self.write(target);
                        if !safe.is_empty() {
                            self.write(" ");
                            self.write(&safe);
                        }
                        self.write("?>");
                    }
                    PiMode::Comment => {
                        self.mark(range.start);
                        let safe = neutralize(&neutralize(data, "?>", "? >"), "--", "- -");
                        self.write("<!--?");
                        self.write(target);
                        if !safe.is_empty() {
                            self.write(" ");
                            self.write(&safe);
                        }
                        self.write("?-->");
                    }
                }
            }
            Node::Doctype { value, range, .. } => {
                if self.options.doctype {
                    return;
                }
                self.mark(range.start);
                self.write("<!DOCTYPE ");
                self.write(value);
                self.write(">");
            }
        }
    }

    fn render_element(&mut self, node: &'a Node, depth: usize, flat: bool) {
        let Node::Element {
            name,
            prefix,
            local_name,
            mode,
            attributes,
            namespace_declarations,
            is_void,
            children,
            range,
            ..
        } = node
        else {
            return;
        };
        self.scopes.push(namespace_declarations);

        match mode {
            Mode::Lenient => {
                let lower = name.to_ascii_lowercase();
                let raw = !name.contains(':') && is_raw_text_element(&lower);
                self.mark(range.start);
                self.open_tag(name, attributes, AttributeStyle::Verbatim, false);
                if *is_void {
                    self.scopes.pop();
                    return;
                }
                if raw {
                    for child in children {
                        if let Node::Text { text, .. } = child {
                            self.write(text);
                        } else {
                            self.render_node(child, depth, true);
                        }
                    }
                } else {
                    self.render_body(children, depth, flat);
                }
                self.close_tag(name, range.start);
            }
            Mode::Strict => match self.options.strategy {
                StrictStrategy::Strip => {
                    self.render_list(children, depth, flat);
                }
                StrictStrategy::Passthrough => {
                    self.mark(range.start);
                    if *is_void {
                        self.open_tag(name, attributes, AttributeStyle::Verbatim, true);
                    } else {
                        self.open_tag(name, attributes, AttributeStyle::Verbatim, false);
                        self.render_body(children, depth, flat);
                        self.close_tag(name, range.start);
                    }
                }
                StrictStrategy::CustomTag => {
                    let uri =
                        namespace::resolve_prefix(&self.scopes, prefix.as_deref());
                    let foreign = uri.is_some_and(namespace::is_foreign_content);
                    self.mark(range.start);
                    if foreign {
                        let tag = local_name.clone();
                        if *is_void {
                            self.open_tag(&tag, attributes, AttributeStyle::RemapXmlns, true);
                        } else {
                            self.open_tag(&tag, attributes, AttributeStyle::RemapXmlns, false);
                            self.render_body(children, depth, flat);
                            self.close_tag(&tag, range.start);
                        }
                    } else {
                        let tag = format!(
                            "{}{}",
                            self.options.custom_element_prefix,
                            name.replace(':', "-")
                        );
                        // Custom elements cannot self-close in HTML.
                        self.open_tag(&tag, attributes, AttributeStyle::RemapXmlns, false);
                        if !*is_void {
                            self.render_body(children, depth, flat);
                        }
                        self.close_tag(&tag, range.start);
                    }
                }
                StrictStrategy::DataAttribute => {
                    self.mark(range.start);
                    let mut open = String::from("<span data-element=\"");
                    open.push_str(&escape_attr(name));
                    open.push('"');
                    for attribute in attributes {
                        open.push(' ');
                        open.push_str("data-");
                        open.push_str(&attribute.name.replace(':', "-"));
                        if let Some(value) = &attribute.value {
                            open.push_str("=\"");
                            open.push_str(&escape_attr(value));
                            open.push('"');
                        }
                    }
                    open.push('>');
                    self.write(&open);
                    if !*is_void {
                        self.render_body(children, depth, flat);
                    }
                    self.close_tag("span", range.start);
                }
            },
        }
        self.scopes.pop();
    }

    /// Render an element body, choosing between one line and an indented
    /// block; the surrounding tags are already written.
    fn render_body(&mut self, children: &'a [Node], depth: usize, flat: bool) {
        let block = !flat
            && !self.options.indent.is_empty()
            && children.iter().any(|child| self.forces_block(child));
        if block {
            self.write("\n");
            self.render_list(children, depth + 1, false);
            self.write_indent(depth);
        } else {
            self.render_list(children, depth, true);
        }
    }

    fn open_tag(
        &mut self,
        tag: &str,
        attributes: &[Attribute],
        style: AttributeStyle,
        self_close: bool,
    ) {
        let mut out = String::with_capacity(tag.len() + 2);
        out.push('<');
        out.push_str(tag);
        for attribute in attributes {
            match style {
                AttributeStyle::Verbatim => {
                    out.push(' ');
                    out.push_str(&attribute.name);
                }
                AttributeStyle::RemapXmlns => {
                    out.push(' ');
                    if attribute.name == "xmlns" || attribute.name.starts_with("xmlns:") {
                        out.push_str("data-");
                        out.push_str(&attribute.name.replace(':', "-"));
                    } else {
                        out.push_str(&attribute.name);
                    }
                }
            }
            if let Some(value) = &attribute.value {
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
        }
        if self_close {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        self.write(&out);
    }

    fn close_tag(&mut self, tag: &str, origin: Position) {
        self.mark(origin);
        let mut out = String::with_capacity(tag.len() + 3);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        self.write(&out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttributeStyle {
    Verbatim,
    RemapXmlns,
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

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace `needle` until none remains; replacements can re-create the needle
/// at a seam (`---`), so this loops to a fixed point.
fn neutralize(text: &str, needle: &str, replacement: &str) -> String {
    let mut out = text.to_string();
    while out.contains(needle) {
        out = out.replace(needle, replacement);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_builder::{parse, ParseOptions};

    fn parse_fragment(source: &str) -> Node {
        parse(
            source,
            &ParseOptions {
                fragment: true,
                ..ParseOptions::default()
            },
        )
        .root
    }

    fn emit_with(source: &str, options: &EmitOptions) -> String {
        emit(&parse_fragment(source), options).output
    }

    fn emit_default(source: &str) -> String {
        emit_with(source, &EmitOptions::default())
    }

    fn options(strategy: StrictStrategy) -> EmitOptions {
        EmitOptions {
            strategy,
            ..EmitOptions::default()
        }
    }

    #[test]
    fn lenient_roundtrip_is_plain_html() {
        assert_eq!(
            emit_default("<div class=\"a\"><p>hi</p></div>"),
            "<div class=\"a\"><p>hi</p></div>"
        );
    }

    #[test]
    fn void_elements_have_no_close_tag() {
        assert_eq!(emit_default("<br><img src=\"x\">"), "<br><img src=\"x\">");
    }

    #[test]
    fn boolean_attributes_render_bare() {
        assert_eq!(emit_default("<input disabled>"), "<input disabled>");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let root = parse_fragment("<p title=\"a&amp;b\">x &lt; y</p>");
        assert_eq!(
            emit(&root, &EmitOptions::default()).output,
            "<p title=\"a&amp;b\">x &lt; y</p>"
        );
    }

    #[test]
    fn raw_text_children_are_verbatim() {
        assert_eq!(
            emit_default("<script>if (a < b) x();</script>"),
            "<script>if (a < b) x();</script>"
        );
    }

    #[test]
    fn custom_tag_strategy_hyphenates() {
        assert_eq!(
            emit_with("<data:record id=\"1\">x</data:record>", &options(StrictStrategy::CustomTag)),
            "<data-record id=\"1\">x</data-record>"
        );
    }

    #[test]
    fn custom_tag_prefix_applies() {
        let opts = EmitOptions {
            custom_element_prefix: "x-".to_string(),
            ..options(StrictStrategy::CustomTag)
        };
        assert_eq!(
            emit_with("<data:record>x</data:record>", &opts),
            "<x-data-record>x</x-data-record>"
        );
    }

    #[test]
    fn custom_tag_remaps_namespace_declarations() {
        assert_eq!(
            emit_with(
                "<data:r xmlns:data=\"urn:d\">x</data:r>",
                &options(StrictStrategy::CustomTag)
            ),
            "<data-r data-xmlns-data=\"urn:d\">x</data-r>"
        );
    }

    #[test]
    fn foreign_content_renders_bare_local_names() {
        let out = emit_with(
            "<svg:svg xmlns:svg=\"http://www.w3.org/2000/svg\"><svg:circle r=\"4\"/></svg:svg>",
            &options(StrictStrategy::CustomTag),
        );
        assert_eq!(
            out,
            "<svg data-xmlns-svg=\"http://www.w3.org/2000/svg\"><circle r=\"4\"/></svg>"
        );
    }

    #[test]
    fn data_attribute_strategy_wraps_and_remaps() {
        assert_eq!(
            emit_with(
                "<data:rec id=\"1\" flag>x</data:rec>",
                &options(StrictStrategy::DataAttribute)
            ),
            "<span data-element=\"data:rec\" data-id=\"1\" data-flag>x</span>"
        );
    }

    #[test]
    fn passthrough_strategy_keeps_qualified_names() {
        assert_eq!(
            emit_with(
                "<data:rec a=\"1\"><data:f/>t</data:rec>",
                &options(StrictStrategy::Passthrough)
            ),
            "<data:rec a=\"1\"><data:f/>t</data:rec>"
        );
    }

    #[test]
    fn strip_strategy_renders_children_in_place() {
        assert_eq!(
            emit_with("a<data:wrap>b<i>c</i></data:wrap>d", &options(StrictStrategy::Strip)),
            "ab<i>c</i>d"
        );
    }

    #[test]
    fn comments_neutralize_double_dashes() {
        assert_eq!(emit_default("<!--a--b-->"), "<!--a- -b-->");
        let tricky = emit_default("<!--a---b-->");
        assert!(!tricky[4..tricky.len() - 3].contains("--"), "got: {tricky}");
    }

    #[test]
    fn xml_targeted_pi_is_suppressed() {
        assert_eq!(emit_default("<?xml version=\"1.0\"?><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn pi_modes_render_keep_comment_strip() {
        assert_eq!(emit_default("<?app run?>"), "<?app run?>");
        let comment = EmitOptions {
            processing_instruction_mode: PiMode::Comment,
            ..EmitOptions::default()
        };
        assert_eq!(emit_with("<?app run?>", &comment), "<!--?app run?-->");
        let strip = EmitOptions {
            processing_instruction_mode: PiMode::Strip,
            ..EmitOptions::default()
        };
        assert_eq!(emit_with("<?app run?>", &strip), "");
    }

    #[test]
    fn pi_data_neutralizes_early_terminator() {
        let root = Node::ProcessingInstruction {
            target: "app".to_string(),
            data: "x ?> y".to_string(),
            mode: Mode::Lenient,
            range: crate::position::LineIndex::new("").range(0, 0),
        };
        let root = Node::Root {
            children: vec![root],
            range: crate::position::LineIndex::new("").range(0, 0),
        };
        assert_eq!(emit(&root, &EmitOptions::default()).output, "<?app x ? > y?>");
    }

    #[test]
    fn cdata_renders_as_comment_or_escaped_text() {
        assert_eq!(
            emit_default("<data:x><![CDATA[a<b]]></data:x>"),
            "<data-x><!--[CDATA[a<b]]--></data-x>"
        );
        let escaped = EmitOptions {
            preserve_cdata_as_comment: false,
            ..EmitOptions::default()
        };
        assert_eq!(
            emit_with("<data:x><![CDATA[a<b]]></data:x>", &escaped),
            "<data-x>a&lt;b</data-x>"
        );
    }

    #[test]
    fn doctype_option_prepends_standard_line_once() {
        let opts = EmitOptions {
            doctype: true,
            ..EmitOptions::default()
        };
        let root = parse("<!DOCTYPE html><p>x</p>", &ParseOptions::default()).root;
        let out = emit(&root, &opts).output;
        assert_eq!(out.matches("<!DOCTYPE").count(), 1, "got: {out}");
        assert!(out.starts_with("<!DOCTYPE html>\n"), "got: {out}");
    }

    #[test]
    fn pretty_printing_indents_block_children() {
        let opts = EmitOptions {
            indent: "  ".to_string(),
            ..EmitOptions::default()
        };
        let out = emit_with("<ul><li>One<li>Two</ul>", &opts);
        assert_eq!(out, "<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>\n");
    }

    #[test]
    fn inline_only_content_stays_on_one_line() {
        let opts = EmitOptions {
            indent: "  ".to_string(),
            ..EmitOptions::default()
        };
        let out = emit_with("<p>a <b>bold</b> c</p>", &opts);
        assert_eq!(out, "<p>a <b>bold</b> c</p>\n");
    }

    #[test]
    fn pretty_printing_collapses_interelement_whitespace() {
        let opts = EmitOptions {
            indent: "  ".to_string(),
            ..EmitOptions::default()
        };
        let root = parse(
            "<div>\n   <p>a</p>\n   <p>b</p>\n</div>",
            &ParseOptions {
                preserve_whitespace: true,
                fragment: true,
            },
        )
        .root;
        let out = emit(&root, &opts).output;
        assert_eq!(out, "<div>\n  <p>a</p>\n  <p>b</p>\n</div>\n");
    }

    #[test]
    fn zero_indent_renders_flat() {
        let out = emit_default("<div><p>a</p><p>b</p></div>");
        assert!(!out.contains('\n'), "got: {out}");
    }

    #[test]
    fn streaming_and_buffered_forms_are_byte_identical() {
        let source = "<!DOCTYPE html><div a=\"1\"><data:r xmlns:data=\"u\">x</data:r><ul><li>1<li>2</ul></div>";
        let root = parse(source, &ParseOptions::default()).root;
        let opts = EmitOptions {
            indent: "  ".to_string(),
            doctype: true,
            source_map: true,
            ..EmitOptions::default()
        };
        let buffered = emit(&root, &opts);
        let mut streamed = String::new();
        let mut chunks = 0usize;
        let map = {
            let mut sink = |chunk: &str| {
                streamed.push_str(chunk);
                chunks += 1;
            };
            emit_to_stream(&root, &mut sink, &opts)
        };
        assert_eq!(buffered.output, streamed);
        assert!(chunks > 1, "expected chunked output, got {chunks} chunk(s)");
        assert_eq!(buffered.source_map, map);
    }

    #[test]
    fn source_map_records_mappings_for_each_line() {
        let opts = EmitOptions {
            indent: "  ".to_string(),
            source_map: true,
            source_file: Some("doc.mx".to_string()),
            ..EmitOptions::default()
        };
        let outcome = emit(&parse_fragment("<ul><li>One<li>Two</ul>"), &opts);
        let map = outcome.source_map.expect("source map");
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["doc.mx".to_string()]);
        assert!(map.names.is_empty());
        // Four output lines => three ';' separators, each line mapped.
        assert_eq!(map.mappings.matches(';').count(), outcome.output.matches('\n').count());
        assert!(!map.mappings.is_empty());
    }

    #[test]
    fn scoped_foreign_namespace_applies_to_descendants_only() {
        let out = emit_with(
            "<m:math xmlns:m=\"http://www.w3.org/1998/Math/MathML\"><m:mi>x</m:mi></m:math><m:other>y</m:other>",
            &options(StrictStrategy::CustomTag),
        );
        assert_eq!(
            out,
            "<math data-xmlns-m=\"http://www.w3.org/1998/Math/MathML\"><mi>x</mi></math><m-other>y</m-other>"
        );
    }
}

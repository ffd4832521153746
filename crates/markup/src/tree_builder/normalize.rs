//! Document-shape normalization: implied `html`/`head`/`body` containers.
//!
//! Runs after the token scan, only for whole-document parses. Children are
//! moved or wrapped, never discarded.

use super::rules;
use crate::position::{Position, SourceRange};
use crate::types::{Mode, Node};

/// Normalize the root's children when the input shows structural document
/// hints: a top-level doctype, or a top-level `html`/`head`/`body` element.
/// Afterwards the root holds the doctypes (hoisted to the front, order kept)
/// followed by exactly one `html` element containing one `head` and one
/// `body`.
pub(crate) fn normalize_document(children: Vec<Node>) -> Vec<Node> {
    if !has_document_hints(&children) {
        return children;
    }

    let mut doctypes = Vec::new();
    let mut existing_html = None;
    let mut top_level = Vec::new();
    for node in children {
        if matches!(node, Node::Doctype { .. }) {
            doctypes.push(node);
        } else if existing_html.is_none() && is_unprefixed_named(&node, "html") {
            existing_html = Some(node);
        } else {
            top_level.push(node);
        }
    }

    // Unpack the html shell; its loose children join the distribution list
    // ahead of any stray top-level nodes.
    let mut head_node: Option<Node> = None;
    let mut body_node: Option<Node> = None;
    let mut work = Vec::new();
    let html_range;
    let html_parts = match existing_html {
        Some(mut html) => {
            html_range = html.range();
            let kids = std::mem::take(html.children_mut().expect("html is an element"));
            for child in kids {
                if head_node.is_none() && is_unprefixed_named(&child, "head") {
                    head_node = Some(child);
                } else if body_node.is_none() && is_unprefixed_named(&child, "body") {
                    body_node = Some(child);
                } else {
                    work.push(child);
                }
            }
            Some(html)
        }
        None => {
            html_range = zero_width_range(
                top_level
                    .first()
                    .map(|node| node.range().start)
                    .unwrap_or_else(default_position),
            );
            None
        }
    };

    let mut head_extra = Vec::new();
    let mut body_extra = Vec::new();
    let mut in_head_phase = true;
    for node in top_level {
        // A stray top-level <head>/<body> becomes the container itself.
        if head_node.is_none() && is_unprefixed_named(&node, "head") {
            head_node = Some(node);
            continue;
        }
        if body_node.is_none() && is_unprefixed_named(&node, "body") {
            body_node = Some(node);
            in_head_phase = false;
            continue;
        }
        work.push(node);
    }
    for node in work {
        if in_head_phase && is_head_only_element(&node) {
            head_extra.push(node);
            continue;
        }
        if matches!(&node, Node::Element { .. }) && !is_head_only_element(&node) {
            in_head_phase = false;
        }
        body_extra.push(node);
    }

    let mut head = head_node.unwrap_or_else(|| {
        synthesize_element(
            "head",
            zero_width_range(
                head_extra
                    .first()
                    .map(|node| node.range().start)
                    .unwrap_or(html_range.start),
            ),
        )
    });
    head.children_mut()
        .expect("head is an element")
        .extend(head_extra);

    let mut body = body_node.unwrap_or_else(|| {
        synthesize_element(
            "body",
            zero_width_range(
                body_extra
                    .first()
                    .map(|node| node.range().start)
                    .unwrap_or(html_range.start),
            ),
        )
    });
    body.children_mut()
        .expect("body is an element")
        .extend(body_extra);

    let mut html = html_parts.unwrap_or_else(|| synthesize_element("html", html_range));
    {
        let html_children = html.children_mut().expect("html is an element");
        html_children.push(head);
        html_children.push(body);
    }

    doctypes.push(html);
    doctypes
}

fn has_document_hints(children: &[Node]) -> bool {
    children.iter().any(|node| match node {
        Node::Doctype { .. } => true,
        Node::Element { name, .. } if !name.contains(':') => {
            rules::is_document_level(&name.to_ascii_lowercase())
        }
        _ => false,
    })
}

fn is_unprefixed_named(node: &Node, target: &str) -> bool {
    matches!(node, Node::Element { name, .. }
        if !name.contains(':') && name.eq_ignore_ascii_case(target))
}

fn is_head_only_element(node: &Node) -> bool {
    matches!(node, Node::Element { name, mode: Mode::Lenient, .. }
        if !name.contains(':') && rules::is_head_only(&name.to_ascii_lowercase()))
}

fn default_position() -> Position {
    Position {
        line: 1,
        column: 0,
        offset: 0,
    }
}

fn zero_width_range(at: Position) -> SourceRange {
    SourceRange::new(at, at)
}

fn synthesize_element(name: &str, range: SourceRange) -> Node {
    Node::Element {
        name: name.to_string(),
        prefix: None,
        local_name: name.to_string(),
        mode: Mode::Lenient,
        attributes: Vec::new(),
        namespace_declarations: Vec::new(),
        self_closing: false,
        is_void: false,
        children: Vec::new(),
        range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_builder::{parse, ParseOptions};

    fn parse_document(source: &str) -> Node {
        parse(source, &ParseOptions::default()).root
    }

    fn child_names(node: &Node) -> Vec<String> {
        node.children()
            .unwrap_or(&[])
            .iter()
            .map(|child| match child {
                Node::Element { name, .. } => name.clone(),
                Node::Doctype { .. } => "#doctype".to_string(),
                Node::Text { .. } => "#text".to_string(),
                Node::Comment { .. } => "#comment".to_string(),
                _ => "#other".to_string(),
            })
            .collect()
    }

    fn html_of(root: &Node) -> &Node {
        root.children()
            .unwrap()
            .iter()
            .find(|c| c.is_element_named("html"))
            .expect("html element")
    }

    #[test]
    fn fragment_without_hints_is_untouched() {
        let root = parse_document("<p>hello</p>");
        assert_eq!(child_names(&root), ["p"]);
    }

    #[test]
    fn doctype_alone_builds_the_full_shell() {
        let root = parse_document("<!DOCTYPE html>");
        assert_eq!(child_names(&root), ["#doctype", "html"]);
        assert_eq!(child_names(html_of(&root)), ["head", "body"]);
    }

    #[test]
    fn head_only_tags_go_to_head_until_first_other_element() {
        let root =
            parse_document("<!DOCTYPE html><title>T</title><meta a=\"1\"><p>x</p><link rel=\"r\">");
        let html = html_of(&root);
        let head = &html.children().unwrap()[0];
        let body = &html.children().unwrap()[1];
        assert_eq!(child_names(head), ["title", "meta"]);
        assert_eq!(child_names(body), ["p", "link"]);
    }

    #[test]
    fn existing_html_gains_missing_containers() {
        let root = parse_document("<html><title>T</title><div>d</div></html>");
        let html = html_of(&root);
        assert_eq!(child_names(html), ["head", "body"]);
        assert_eq!(child_names(&html.children().unwrap()[0]), ["title"]);
        assert_eq!(child_names(&html.children().unwrap()[1]), ["div"]);
    }

    #[test]
    fn existing_head_and_body_are_kept_not_duplicated() {
        let root =
            parse_document("<html><head><meta x=\"1\"></head><body><p>x</p></body></html>");
        let html = html_of(&root);
        assert_eq!(child_names(html), ["head", "body"]);
        assert_eq!(child_names(&html.children().unwrap()[0]), ["meta"]);
        assert_eq!(child_names(&html.children().unwrap()[1]), ["p"]);
    }

    #[test]
    fn stray_body_element_becomes_the_container() {
        let root = parse_document("<body><p>x</p></body>");
        let html = html_of(&root);
        assert_eq!(child_names(html), ["head", "body"]);
        assert_eq!(child_names(&html.children().unwrap()[1]), ["p"]);
    }

    #[test]
    fn nothing_is_discarded_by_normalization() {
        let source = "<!DOCTYPE html><!--c--><title>T</title>text<div>d</div>";
        let root = parse_document(source);
        let html = html_of(&root);
        let body = &html.children().unwrap()[1];
        // Comment and text both survive into the body.
        assert!(child_names(body).contains(&"#comment".to_string()), "got: {body:?}");
        assert!(child_names(body).contains(&"#text".to_string()), "got: {body:?}");
        assert!(child_names(body).contains(&"div".to_string()), "got: {body:?}");
    }
}

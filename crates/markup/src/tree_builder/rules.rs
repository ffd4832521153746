//! Static name tables driving lenient-mode heuristics.
//!
//! All functions take already lower-cased names; callers lower-case once per
//! tag and reuse the result.

/// Unprefixed element name that switches all descendants into strict mode
/// until its matching close.
pub(crate) const MODE_SWITCH_MARKER: &str = "xml";

/// HTML void elements: may never have children in lenient mode.
pub(crate) fn is_void_element(lower: &str) -> bool {
    matches!(
        lower,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements that belong in `<head>` during document-shape normalization.
pub(crate) fn is_head_only(lower: &str) -> bool {
    matches!(
        lower,
        "base" | "link" | "meta" | "noscript" | "script" | "style" | "template" | "title"
    )
}

/// Top-level names that hint the input is a whole document.
pub(crate) fn is_document_level(lower: &str) -> bool {
    matches!(lower, "html" | "head" | "body")
}

/// Block-level names for paragraph auto-close and emitter line-breaking.
pub(crate) fn is_block_level(lower: &str) -> bool {
    matches!(
        lower,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "dd"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "li"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "td"
            | "th"
            | "caption"
            | "colgroup"
            | "ul"
            | "html"
            | "head"
            | "body"
    )
}

/// The HTML5 "optional end tag" table: does an open lenient element named
/// `open` implicitly close when a tag named `incoming` starts?
pub(crate) fn closes_on_open(open: &str, incoming: &str) -> bool {
    match open {
        "p" => incoming == "p" || is_paragraph_closer(incoming),
        "li" => incoming == "li",
        "dt" | "dd" => matches!(incoming, "dt" | "dd"),
        "option" => matches!(incoming, "option" | "optgroup"),
        "optgroup" => incoming == "optgroup",
        "thead" => matches!(incoming, "tbody" | "tfoot"),
        "tbody" => matches!(incoming, "tbody" | "tfoot"),
        "tfoot" => incoming == "tbody",
        "tr" => incoming == "tr",
        "td" | "th" => matches!(incoming, "td" | "th" | "tr"),
        "caption" | "colgroup" => {
            matches!(incoming, "thead" | "tbody" | "tfoot" | "tr" | "td" | "th")
        }
        _ => false,
    }
}

fn is_paragraph_closer(incoming: &str) -> bool {
    matches!(
        incoming,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

/// Inline formatting names eligible for stray-close-tag recovery. This is an
/// intentionally partial subset of the reference recovery algorithm.
pub(crate) fn is_formatting_recovery_name(lower: &str) -> bool {
    matches!(lower, "b" | "i" | "em" | "strong" | "u" | "s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_items_close_each_other() {
        assert!(closes_on_open("li", "li"));
        assert!(!closes_on_open("li", "p"));
        assert!(closes_on_open("dt", "dd"));
        assert!(closes_on_open("dd", "dt"));
    }

    #[test]
    fn paragraphs_close_on_block_level_tags() {
        assert!(closes_on_open("p", "p"));
        assert!(closes_on_open("p", "div"));
        assert!(closes_on_open("p", "table"));
        assert!(!closes_on_open("p", "span"));
        assert!(!closes_on_open("p", "b"));
    }

    #[test]
    fn table_sections_do_not_nest() {
        assert!(closes_on_open("thead", "tbody"));
        assert!(closes_on_open("tbody", "tfoot"));
        assert!(closes_on_open("tr", "tr"));
        assert!(closes_on_open("td", "th"));
        assert!(closes_on_open("colgroup", "tr"));
        assert!(!closes_on_open("table", "tr"));
    }

    #[test]
    fn void_and_head_tables_cover_expected_names() {
        assert!(is_void_element("br"));
        assert!(is_void_element("col"));
        assert!(!is_void_element("div"));
        assert!(is_head_only("meta"));
        assert!(is_head_only("template"));
        assert!(!is_head_only("div"));
    }
}

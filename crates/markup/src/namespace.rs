//! Namespace scope resolution.
//!
//! Effective resolution is always a dynamic walk over the stack of per-element
//! declaration lists, innermost first. Nothing is cached on nodes: a sibling's
//! declarations must never leak, and within one element a later declaration
//! shadows an earlier one.

use crate::types::NamespaceDeclaration;

/// Well-known namespace URIs.
pub mod ns {
    /// Foreign-content namespaces render under their bare local name in the
    /// custom-tag emit strategy.
    pub const SVG: &str = "http://www.w3.org/2000/svg";
    pub const MATHML: &str = "http://www.w3.org/1998/Math/MathML";
}

/// `xml` and `xmlns` are bound implicitly and may not be redeclared; prefix
/// resolution skips them.
pub(crate) fn is_reserved_prefix(prefix: &str) -> bool {
    prefix == "xml" || prefix == "xmlns"
}

/// Resolve a prefix (or the default namespace, `None`) against a stack of
/// per-element declaration scopes, innermost scope last.
///
/// The innermost binding wins outright: an empty-string URI explicitly
/// un-declares the prefix for that subtree and does not fall through to an
/// ancestor's value.
pub(crate) fn resolve_prefix<'a>(
    scopes: &[&'a [NamespaceDeclaration]],
    prefix: Option<&str>,
) -> Option<&'a str> {
    for scope in scopes.iter().rev() {
        for (declared, uri) in scope.iter().rev() {
            if declared.as_deref() == prefix {
                if uri.is_empty() {
                    return None;
                }
                return Some(uri.as_str());
            }
        }
    }
    None
}

/// Namespaces whose elements an HTML renderer interprets natively.
pub(crate) fn is_foreign_content(uri: &str) -> bool {
    uri == ns::SVG || uri == ns::MATHML
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(prefix: Option<&str>, uri: &str) -> NamespaceDeclaration {
        (prefix.map(str::to_string), uri.to_string())
    }

    #[test]
    fn innermost_binding_wins() {
        let outer = [decl(Some("p"), "urn:outer")];
        let inner = [decl(Some("p"), "urn:inner")];
        let scopes: Vec<&[NamespaceDeclaration]> = vec![&outer, &inner];
        assert_eq!(resolve_prefix(&scopes, Some("p")), Some("urn:inner"));
    }

    #[test]
    fn empty_uri_undeclares_without_fallthrough() {
        let outer = [decl(Some("p"), "urn:outer")];
        let inner = [decl(Some("p"), "")];
        let scopes: Vec<&[NamespaceDeclaration]> = vec![&outer, &inner];
        assert_eq!(resolve_prefix(&scopes, Some("p")), None);
    }

    #[test]
    fn later_declaration_on_one_element_shadows_earlier() {
        let one = [decl(Some("p"), "urn:a"), decl(Some("p"), "urn:b")];
        let scopes: Vec<&[NamespaceDeclaration]> = vec![&one];
        assert_eq!(resolve_prefix(&scopes, Some("p")), Some("urn:b"));
    }

    #[test]
    fn default_namespace_uses_the_none_key() {
        let one = [decl(None, "urn:default"), decl(Some("p"), "urn:p")];
        let scopes: Vec<&[NamespaceDeclaration]> = vec![&one];
        assert_eq!(resolve_prefix(&scopes, None), Some("urn:default"));
        assert_eq!(resolve_prefix(&scopes, Some("q")), None);
    }

    #[test]
    fn foreign_content_uris_are_exactly_svg_and_mathml() {
        assert!(is_foreign_content(ns::SVG));
        assert!(is_foreign_content(ns::MATHML));
        assert!(!is_foreign_content("urn:x"));
    }
}

//! Whole-document validation: the checks that cannot run online during
//! parsing because they need the completed tree.
//!
//! Pure over the tree: never mutates, never short-circuits; every check
//! contributes independently to one diagnostic list.

use std::collections::{HashMap, HashSet};

use crate::diag::{codes, Diagnostic};
use crate::namespace;
use crate::types::{Attribute, Mode, NamespaceDeclaration, Node};

/// Conformance rules for one element, keyed by its qualified or local name.
#[derive(Clone, Debug, Default)]
pub struct SchemaRule {
    /// Attribute names that must be present.
    pub required_attributes: Vec<String>,
    /// Names that must appear among direct strict-mode element children.
    pub required_children: Vec<String>,
    /// When set, every direct strict-mode element child must be listed.
    pub allowed_children: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct ValidateOptions {
    pub enforce_id_uniqueness: bool,
    pub schema: HashMap<String, SchemaRule>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            enforce_id_uniqueness: true,
            schema: HashMap::new(),
        }
    }
}

/// The reserved ID attribute checked for global uniqueness.
const ID_ATTRIBUTE: &str = "xml:id";

pub fn validate(root: &Node, options: &ValidateOptions) -> Vec<Diagnostic> {
    let mut validator = Validator {
        options,
        scopes: Vec::new(),
        seen_ids: HashSet::new(),
        diagnostics: Vec::new(),
    };
    validator.run(root);
    validator.diagnostics
}

enum Task<'a> {
    Enter(&'a Node),
    LeaveElement,
}

struct Validator<'a> {
    options: &'a ValidateOptions,
    /// Stack of per-element declaration lists, pushed around each element's
    /// subtree. Resolution walks it innermost-first.
    scopes: Vec<&'a [NamespaceDeclaration]>,
    seen_ids: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Validator<'a> {
    fn run(&mut self, root: &'a Node) {
        let mut work = vec![Task::Enter(root)];
        while let Some(task) = work.pop() {
            match task {
                Task::LeaveElement => {
                    self.scopes.pop();
                }
                Task::Enter(node) => match node {
                    Node::Root { children, .. } => {
                        for child in children.iter().rev() {
                            work.push(Task::Enter(child));
                        }
                    }
                    Node::Element {
                        namespace_declarations,
                        children,
                        ..
                    } => {
                        // Own declarations participate in resolving the
                        // element's own name and attributes, so they are
                        // pushed before the checks run. This is what makes a
                        // prefix used on its own un-declaring element an
                        // error.
                        self.scopes.push(namespace_declarations);
                        self.check_element(node);
                        work.push(Task::LeaveElement);
                        for child in children.iter().rev() {
                            work.push(Task::Enter(child));
                        }
                    }
                    Node::CData { mode, range, .. } => {
                        if *mode == Mode::Lenient {
                            self.diagnostics.push(Diagnostic::warning(
                                codes::CDATA_IN_LENIENT_CONTEXT,
                                "CDATA section in lenient context; it will not survive \
                                 HTML rendering",
                                *range,
                            ));
                        }
                    }
                    Node::Doctype { value, range, .. } => {
                        if !value.eq_ignore_ascii_case("html") {
                            self.diagnostics.push(
                                Diagnostic::warning(
                                    codes::NONSTANDARD_DOCTYPE,
                                    format!("non-standard doctype `{value}`"),
                                    *range,
                                )
                                .with_hint("expected `<!DOCTYPE html>`"),
                            );
                        }
                    }
                    Node::Text { .. }
                    | Node::Comment { .. }
                    | Node::ProcessingInstruction { .. } => {}
                },
            }
        }
    }

    fn check_element(&mut self, node: &'a Node) {
        let Node::Element {
            name,
            prefix,
            local_name,
            mode,
            attributes,
            namespace_declarations,
            range,
            children,
            ..
        } = node
        else {
            return;
        };

        // One resolution cache per element; repeated prefixes on one tag are
        // common and each lookup would otherwise rescan the whole scope stack.
        let mut cache: HashMap<&'a str, bool> = HashMap::new();

        if let Some(p) = prefix {
            if !namespace::is_reserved_prefix(p)
                && !resolved_with_cache(&mut cache, &self.scopes, p.as_str())
            {
                self.diagnostics.push(Diagnostic::error(
                    codes::UNDECLARED_PREFIX,
                    format!("undeclared namespace prefix `{p}` on element <{name}>"),
                    *range,
                ));
            }
        }

        for attribute in attributes {
            let Some((attr_prefix, _)) = attribute.name.split_once(':') else {
                continue;
            };
            if attr_prefix.is_empty()
                || namespace::is_reserved_prefix(attr_prefix)
                || attribute.name == "xmlns"
            {
                continue;
            }
            if !resolved_with_cache(&mut cache, &self.scopes, attr_prefix) {
                self.diagnostics.push(Diagnostic::error(
                    codes::UNDECLARED_PREFIX,
                    format!(
                        "undeclared namespace prefix `{attr_prefix}` on attribute `{}`",
                        attribute.name
                    ),
                    attribute.range,
                ));
            }
        }

        self.check_duplicate_declarations(namespace_declarations, range);

        if *mode == Mode::Strict {
            self.check_strict_attributes(attributes);
        }

        if self.options.enforce_id_uniqueness && *mode == Mode::Strict {
            for attribute in attributes {
                if attribute.name == ID_ATTRIBUTE {
                    if let Some(value) = &attribute.value {
                        if !self.seen_ids.insert(value.clone()) {
                            self.diagnostics.push(Diagnostic::error(
                                codes::DUPLICATE_ID,
                                format!("duplicate {ID_ATTRIBUTE} value `{value}`"),
                                attribute.range,
                            ));
                        }
                    }
                }
            }
        }

        let rule = self
            .options
            .schema
            .get(name)
            .or_else(|| self.options.schema.get(local_name));
        if let Some(rule) = rule {
            self.check_schema_rule(rule, name, attributes, children, range);
        }
    }

    fn check_duplicate_declarations(
        &mut self,
        declarations: &[NamespaceDeclaration],
        range: &crate::position::SourceRange,
    ) {
        for (i, (key, _)) in declarations.iter().enumerate() {
            if declarations[..i].iter().any(|(other, _)| other == key) {
                let shown = key.as_deref().unwrap_or("(default)");
                self.diagnostics.push(Diagnostic::error(
                    codes::DUPLICATE_NAMESPACE_DECLARATION,
                    format!("namespace `{shown}` is declared twice on one element"),
                    *range,
                ));
            }
        }
    }

    fn check_strict_attributes(&mut self, attributes: &[Attribute]) {
        for (i, attribute) in attributes.iter().enumerate() {
            let is_declaration =
                attribute.name == "xmlns" || attribute.name.starts_with("xmlns:");
            // Duplicate declarations are already reported per declaration key.
            if !is_declaration
                && attributes[..i].iter().any(|other| other.name == attribute.name)
            {
                self.diagnostics.push(Diagnostic::error(
                    codes::DUPLICATE_ATTRIBUTE,
                    format!("duplicate attribute `{}` on strict element", attribute.name),
                    attribute.range,
                ));
            }
            if attribute.value.is_none() && !is_declaration {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::BOOLEAN_ATTRIBUTE_IN_STRICT,
                        format!(
                            "boolean attribute `{}` is not allowed on a strict element",
                            attribute.name
                        ),
                        attribute.range,
                    )
                    .with_hint(format!("write {}=\"{}\"", attribute.name, attribute.name)),
                );
            }
        }
    }

    fn check_schema_rule(
        &mut self,
        rule: &SchemaRule,
        name: &str,
        attributes: &[Attribute],
        children: &[Node],
        range: &crate::position::SourceRange,
    ) {
        for required in &rule.required_attributes {
            if !attributes.iter().any(|a| &a.name == required) {
                self.diagnostics.push(Diagnostic::error(
                    codes::MISSING_REQUIRED_ATTRIBUTE,
                    format!("<{name}> is missing required attribute `{required}`"),
                    *range,
                ));
            }
        }

        let strict_children: Vec<(&str, &str)> = children
            .iter()
            .filter_map(|child| match child {
                Node::Element {
                    name,
                    local_name,
                    mode: Mode::Strict,
                    ..
                } => Some((name.as_str(), local_name.as_str())),
                _ => None,
            })
            .collect();

        for required in &rule.required_children {
            let present = strict_children
                .iter()
                .any(|(qualified, local)| qualified == required || local == required);
            if !present {
                self.diagnostics.push(Diagnostic::error(
                    codes::MISSING_REQUIRED_CHILD,
                    format!("<{name}> is missing required child <{required}>"),
                    *range,
                ));
            }
        }

        if let Some(allowed) = &rule.allowed_children {
            for child in children {
                let Node::Element {
                    name: child_name,
                    local_name: child_local,
                    mode: Mode::Strict,
                    range: child_range,
                    ..
                } = child
                else {
                    continue;
                };
                let listed = allowed
                    .iter()
                    .any(|entry| entry == child_name || entry == child_local);
                if !listed {
                    self.diagnostics.push(Diagnostic::error(
                        codes::DISALLOWED_CHILD,
                        format!("<{child_name}> is not an allowed child of <{name}>"),
                        *child_range,
                    ));
                }
            }
        }
    }
}

fn resolved_with_cache<'a>(
    cache: &mut HashMap<&'a str, bool>,
    scopes: &[&'a [NamespaceDeclaration]],
    prefix: &'a str,
) -> bool {
    *cache
        .entry(prefix)
        .or_insert_with(|| namespace::resolve_prefix(scopes, Some(prefix)).is_some())
}

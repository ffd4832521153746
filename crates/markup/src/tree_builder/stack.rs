//! Stack of open elements.
//!
//! Frames are plain values in a growable vec; the tree builder never recurses,
//! so nesting depth is a heap concern, not a native-stack concern.

use crate::position::{Position, SourceRange};
use crate::types::{Attribute, Mode, NamespaceDeclaration, Node};

/// One open element under construction.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) name: String,
    pub(crate) prefix: Option<String>,
    pub(crate) local_name: String,
    /// Cached `name.to_ascii_lowercase()` for table lookups.
    pub(crate) lower_name: String,
    pub(crate) mode: Mode,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) namespace_declarations: Vec<NamespaceDeclaration>,
    pub(crate) in_explicit_strict_region: bool,
    pub(crate) children: Vec<Node>,
    /// Start of the open tag.
    pub(crate) start: Position,
    /// End of the open tag; the fallback close position for implicit closes.
    pub(crate) open_end: Position,
}

impl Frame {
    /// Finish the frame into an owned element node closing at `end`.
    pub(crate) fn into_element(self, end: Position) -> Node {
        Node::Element {
            name: self.name,
            prefix: self.prefix,
            local_name: self.local_name,
            mode: self.mode,
            attributes: self.attributes,
            namespace_declarations: self.namespace_declarations,
            self_closing: false,
            is_void: false,
            children: self.children,
            range: SourceRange::new(self.start, end),
        }
    }
}

/// Open-element stack plus the finished top-level nodes.
#[derive(Debug, Default)]
pub(crate) struct OpenStack {
    frames: Vec<Frame>,
    root_children: Vec<Node>,
}

impl OpenStack {
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Append a finished node to the innermost open element, or to the root
    /// when nothing is open.
    pub(crate) fn append(&mut self, node: Node) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.root_children.push(node),
        }
    }

    /// Pop the top frame, closing it at `end`, and attach it to its parent.
    /// Returns a view of the closed element's name and mode.
    pub(crate) fn close_top(&mut self, end: Position) -> Option<(String, Mode)> {
        let frame = self.frames.pop()?;
        let name = frame.name.clone();
        let mode = frame.mode;
        let node = frame.into_element(end);
        self.append(node);
        Some((name, mode))
    }

    pub(crate) fn into_root_children(mut self, end: Position) -> Vec<Node> {
        while !self.frames.is_empty() {
            self.close_top(end);
        }
        self.root_children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::LineIndex;

    fn frame(name: &str, mode: Mode, index: &LineIndex) -> Frame {
        Frame {
            name: name.to_string(),
            prefix: None,
            local_name: name.to_string(),
            lower_name: name.to_ascii_lowercase(),
            mode,
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
            in_explicit_strict_region: false,
            children: Vec::new(),
            start: index.position_at(0),
            open_end: index.position_at(0),
        }
    }

    #[test]
    fn close_top_attaches_to_parent_frame() {
        let index = LineIndex::new("<a><b></b></a>");
        let mut stack = OpenStack::default();
        stack.push(frame("a", Mode::Lenient, &index));
        stack.push(frame("b", Mode::Lenient, &index));

        let closed = stack.close_top(index.position_at(10));
        assert_eq!(closed, Some(("b".to_string(), Mode::Lenient)));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().unwrap().children.len(), 1);

        let children = stack.into_root_children(index.position_at(14));
        assert_eq!(children.len(), 1);
        assert!(children[0].is_element_named("a"));
    }

    #[test]
    fn into_root_children_drains_every_open_frame() {
        let index = LineIndex::new("<a><b><c>");
        let mut stack = OpenStack::default();
        stack.push(frame("a", Mode::Lenient, &index));
        stack.push(frame("b", Mode::Lenient, &index));
        stack.push(frame("c", Mode::Lenient, &index));
        let children = stack.into_root_children(index.position_at(9));
        assert_eq!(children.len(), 1);
        let Node::Element { children: inner, .. } = &children[0] else {
            panic!("expected element");
        };
        assert_eq!(inner.len(), 1, "got: {inner:?}");
    }
}

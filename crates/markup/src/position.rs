//! Byte-offset to line/column mapping.
//!
//! Invariants:
//! - `line_starts` always contains offset 0, is strictly increasing, and every
//!   entry is a UTF-8 char boundary of the source it was built from.
//! - Lookups never fail: out-of-range offsets clamp to `[0, len]`.

/// A resolved location in the source text.
///
/// `line` is 1-based, `column` is a 0-based byte column within the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/// Half-open source range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start.offset <= end.offset, "range start must be <= end");
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

/// Raw byte span into the source buffer, resolved lazily via [`LineIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must be <= end");
        Self { start, end }
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// Precomputed table of line-start offsets with binary-search lookup.
#[derive(Clone, Debug)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(64);
        line_starts.push(0);
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Resolve a byte offset to a position. Offsets beyond the source clamp to
    /// its end; this is total by construction (line 0 exists even for "").
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        // Greatest line start <= offset.
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insertion) => insertion - 1,
        };
        Position {
            line: line as u32 + 1,
            column: (offset - self.line_starts[line]) as u32,
            offset,
        }
    }

    pub fn range(&self, start: usize, end: usize) -> SourceRange {
        SourceRange::new(self.position_at(start), self.position_at(end))
    }

    pub fn resolve(&self, span: Span) -> SourceRange {
        self.range(span.start, span.end)
    }
}

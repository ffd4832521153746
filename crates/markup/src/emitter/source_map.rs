//! Version-3 source map generation.
//!
//! The `mappings` string encodes, per generated line, a sequence of segments
//! `[generated-column delta, source-index delta, source-line delta,
//! source-column delta]` as base64 VLQ (5-bit groups, continuation bit, sign
//! in the low bit). Deltas for source fields run across the whole map;
//! generated-column deltas reset per line.

use serde::Serialize;

use crate::position::Position;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    /// Always empty; the format requires the field.
    pub names: Vec<String>,
    pub mappings: String,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
}

impl SourceMap {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map serializes")
    }
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0x1F) as u8;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0x20;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Accumulates mappings while the emitter writes output text.
#[derive(Debug, Default)]
pub(crate) struct SourceMapBuilder {
    mappings: String,
    line_has_segment: bool,
    generated_column: i64,
    previous_generated_column: i64,
    previous_source_line: i64,
    previous_source_column: i64,
}

impl SourceMapBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record that the text about to be written originates at `source`.
    pub(crate) fn add_mapping(&mut self, source: Position) {
        if self.line_has_segment {
            self.mappings.push(',');
        }
        let source_line = i64::from(source.line) - 1;
        let source_column = i64::from(source.column);
        encode_vlq(
            &mut self.mappings,
            self.generated_column - self.previous_generated_column,
        );
        encode_vlq(&mut self.mappings, 0); // single source
        encode_vlq(&mut self.mappings, source_line - self.previous_source_line);
        encode_vlq(&mut self.mappings, source_column - self.previous_source_column);
        self.previous_generated_column = self.generated_column;
        self.previous_source_line = source_line;
        self.previous_source_column = source_column;
        self.line_has_segment = true;
    }

    /// Advance the generated position over emitted text.
    pub(crate) fn advance(&mut self, text: &str) {
        for b in text.bytes() {
            if b == b'\n' {
                self.mappings.push(';');
                self.line_has_segment = false;
                self.generated_column = 0;
                self.previous_generated_column = 0;
            } else {
                self.generated_column += 1;
            }
        }
    }

    pub(crate) fn finish(
        self,
        file: Option<String>,
        source_file: Option<String>,
        source_content: Option<String>,
    ) -> SourceMap {
        SourceMap {
            version: 3,
            file,
            sources: vec![source_file.unwrap_or_else(|| "<input>".to_string())],
            names: Vec::new(),
            mappings: self.mappings,
            sources_content: source_content.map(|content| vec![content]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(line: u32, column: u32) -> Position {
        Position {
            line,
            column,
            offset: 0,
        }
    }

    #[test]
    fn vlq_encodes_known_values() {
        let mut out = String::new();
        encode_vlq(&mut out, 0);
        assert_eq!(out, "A");
        out.clear();
        encode_vlq(&mut out, 1);
        assert_eq!(out, "C");
        out.clear();
        encode_vlq(&mut out, -1);
        assert_eq!(out, "D");
        out.clear();
        encode_vlq(&mut out, 16);
        assert_eq!(out, "gB");
        out.clear();
        encode_vlq(&mut out, 123);
        assert_eq!(out, "2H");
    }

    #[test]
    fn first_segment_is_absolute() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(position(1, 0));
        let map = builder.finish(None, None, None);
        assert_eq!(map.mappings, "AAAA");
    }

    #[test]
    fn segments_delta_encode_within_a_line() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(position(1, 0));
        builder.advance("<p>");
        builder.add_mapping(position(1, 3));
        let map = builder.finish(None, None, None);
        assert_eq!(map.mappings, "AAAA,GAAG");
    }

    #[test]
    fn newlines_reset_generated_column_but_not_source_deltas() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(position(1, 0));
        builder.advance("<p>\n");
        builder.add_mapping(position(2, 2));
        let map = builder.finish(None, None, None);
        assert_eq!(map.mappings, "AAAA;AACE");
    }

    #[test]
    fn json_shape_matches_the_format() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(position(1, 0));
        let map = builder.finish(
            Some("out.html".to_string()),
            Some("doc.mx".to_string()),
            Some("<p>".to_string()),
        );
        let json = map.to_json();
        assert!(json.contains("\"version\":3"), "got: {json}");
        assert!(json.contains("\"sources\":[\"doc.mx\"]"), "got: {json}");
        assert!(json.contains("\"sourcesContent\":[\"<p>\"]"), "got: {json}");
        assert!(json.contains("\"names\":[]"), "got: {json}");
    }
}

//! Diagnostics: the pipeline's sole error-reporting channel.
//!
//! Codes live in stable numeric bands and must not be renumbered across
//! versions; downstream tooling matches on them.
//!
//! - 100..199 tokenizer
//! - 200..299 tree builder
//! - 300..399 validator errors
//! - 400..499 validator warnings

use crate::position::SourceRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Stable diagnostic codes. Append-only; never renumber.
pub mod codes {
    // Tokenizer band.
    pub const UNTERMINATED_COMMENT: u16 = 101;
    pub const UNTERMINATED_CDATA: u16 = 102;
    pub const UNTERMINATED_PI: u16 = 103;
    pub const UNTERMINATED_ATTRIBUTE: u16 = 104;
    pub const MALFORMED_DECLARATION: u16 = 105;

    // Tree-builder band.
    pub const UNMATCHED_CLOSE_TAG: u16 = 201;
    pub const UNCLOSED_ELEMENT: u16 = 202;
    pub const ELEMENT_NEVER_CLOSED: u16 = 203;
    pub const STRICT_CASE_MISMATCH: u16 = 204;
    pub const INVALID_NUMERIC_REFERENCE: u16 = 205;
    pub const MULTI_COLON_NAME: u16 = 206;

    // Validator band.
    pub const UNDECLARED_PREFIX: u16 = 301;
    pub const DUPLICATE_NAMESPACE_DECLARATION: u16 = 302;
    pub const DUPLICATE_ATTRIBUTE: u16 = 303;
    pub const BOOLEAN_ATTRIBUTE_IN_STRICT: u16 = 304;
    pub const DUPLICATE_ID: u16 = 305;
    pub const MISSING_REQUIRED_ATTRIBUTE: u16 = 306;
    pub const MISSING_REQUIRED_CHILD: u16 = 307;
    pub const DISALLOWED_CHILD: u16 = 308;

    // Validator warning band.
    pub const CDATA_IN_LENIENT_CONTEXT: u16 = 401;
    pub const NONSTANDARD_DOCTYPE: u16 = 402;
}

/// A located, severity-tagged report of a parse/validate-time condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u16,
    pub message: String,
    pub range: SourceRange,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(code: u16, message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            range,
            hint: None,
        }
    }

    pub fn warning(code: u16, message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            range,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.range.start.line,
            self.range.start.column,
            self.severity.as_str(),
            self.code,
            self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::LineIndex;

    #[test]
    fn display_includes_location_code_and_hint() {
        let index = LineIndex::new("abc\ndef");
        let diag = Diagnostic::error(codes::UNMATCHED_CLOSE_TAG, "unmatched closing tag </b>", index.range(4, 7))
            .with_hint("did you mean </p>?");
        assert_eq!(
            diag.to_string(),
            "2:0: error[201]: unmatched closing tag </b> (did you mean </p>?)"
        );
    }

    #[test]
    fn code_bands_do_not_overlap() {
        use codes::*;
        let tokenizer = [
            UNTERMINATED_COMMENT,
            UNTERMINATED_CDATA,
            UNTERMINATED_PI,
            UNTERMINATED_ATTRIBUTE,
            MALFORMED_DECLARATION,
        ];
        let parser = [
            UNMATCHED_CLOSE_TAG,
            UNCLOSED_ELEMENT,
            ELEMENT_NEVER_CLOSED,
            STRICT_CASE_MISMATCH,
            INVALID_NUMERIC_REFERENCE,
            MULTI_COLON_NAME,
        ];
        assert!(tokenizer.iter().all(|c| (100..200).contains(c)));
        assert!(parser.iter().all(|c| (200..300).contains(c)));
        assert!((300..400).contains(&UNDECLARED_PREFIX));
        assert!((400..500).contains(&CDATA_IN_LENIENT_CONTEXT));
    }
}

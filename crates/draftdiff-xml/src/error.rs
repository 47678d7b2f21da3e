//! Error types for line-tracked XML parsing.

use thiserror::Error;

/// Result type alias for draftdiff-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during XML parsing.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message} at byte {position}")]
    XmlSyntax { message: String, position: u64 },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}> at line {line}")]
    MismatchedEndTag {
        expected: String,
        found: String,
        line: usize,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    /// Content found where only prolog/epilog items are allowed.
    #[error("Unexpected {kind} outside the root element at line {line}")]
    ContentOutsideRoot { kind: String, line: usize },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements at line {line}")]
    MultipleRoots { line: usize },
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            position: 0,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax {
            message: format!("Attribute error: {}", err),
            position: 0,
        }
    }
}

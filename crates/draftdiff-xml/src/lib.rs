//! Line-tracked XML parsing for draftdiff.
//!
//! This crate wraps [`quick-xml`] to produce an owned tree of
//! [`XmlElement`]s in which every element, text fragment, comment, and
//! processing instruction records the source line it came from. Unlike a
//! validating pipeline, nothing is dropped on the floor: comments, CDATA
//! sections, and processing instructions all survive parsing, because the
//! diff core downstream compares them.
//!
//! # Overview
//!
//! The main types are:
//! - [`XmlDocument`]: the parsed document, with prolog/epilog items that
//!   appear outside the root element
//! - [`XmlElement`]: an element with name, attributes in insertion order,
//!   and mixed-content children
//! - [`XmlNode`]: one child of an element (element, text, comment, or
//!   processing instruction)
//!
//! # Example
//!
//! ```rust
//! use draftdiff_xml::parse;
//!
//! let doc = parse("<rfc><front><title>A Title</title></front></rfc>").unwrap();
//! assert_eq!(doc.root.name, "rfc");
//! assert_eq!(doc.root.get_children("front").len(), 1);
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlAttribute, XmlDocument, XmlElement, XmlNode};

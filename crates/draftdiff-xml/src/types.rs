//! Owned tree types for line-tracked XML.

/// A parsed XML document.
///
/// Processing instructions and comments that appear before or after the
/// root element are kept in `prolog` and `epilog` in source order; the
/// diff core decides what to do with them.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// Items appearing before the root element.
    pub prolog: Vec<XmlNode>,

    /// The root element of the document.
    pub root: XmlElement,

    /// Items appearing after the root element.
    pub epilog: Vec<XmlNode>,
}

/// An XML element with attributes and mixed-content children.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The element name, including any namespace prefix as written.
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<XmlAttribute>,

    /// Children in document order: elements, text fragments, comments,
    /// and processing instructions interleaved.
    pub children: Vec<XmlNode>,

    /// 1-based source line of the start tag.
    pub line: usize,
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The attribute name, including any namespace prefix as written.
    pub name: String,

    /// The attribute value after entity unescaping.
    pub value: String,
}

/// A single node in mixed content.
#[derive(Debug, Clone)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),

    /// A text fragment (character data or CDATA).
    Text {
        /// The text content after entity unescaping.
        content: String,
        /// 1-based source line where the fragment starts.
        line: usize,
    },

    /// A comment body (without the `<!--` / `-->` delimiters).
    Comment { content: String, line: usize },

    /// A processing instruction.
    ProcessingInstruction {
        target: String,
        body: String,
        line: usize,
    },
}

impl XmlElement {
    /// Get an attribute value by name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get child elements by name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Element(e) if e.name == name => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text content of the element's immediate text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text { content, .. } = child {
                out.push_str(content);
            }
        }
        out
    }
}

impl XmlNode {
    /// The 1-based source line of this node.
    pub fn line(&self) -> usize {
        match self {
            XmlNode::Element(e) => e.line,
            XmlNode::Text { line, .. }
            | XmlNode::Comment { line, .. }
            | XmlNode::ProcessingInstruction { line, .. } => *line,
        }
    }
}

//! XML parser that builds [`XmlDocument`] trees.

use crate::{Error, Result, XmlAttribute, XmlDocument, XmlElement, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesPI, BytesStart, BytesText, Event};

/// Parse XML from a string, producing an [`XmlDocument`] tree.
///
/// Comments, CDATA sections, and processing instructions are all kept;
/// whitespace in text content is preserved exactly as written. Entity
/// references in text and attribute values are unescaped.
///
/// # Example
///
/// ```rust
/// use draftdiff_xml::parse;
///
/// let doc = parse("<a><b/></a>").unwrap();
/// assert_eq!(doc.root.name, "a");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Byte offsets of line starts, for offset → line conversion.
    line_starts: Vec<usize>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// An element being constructed during parsing.
struct BuildNode {
    name: String,
    attributes: Vec<XmlAttribute>,
    line: usize,
    children: Vec<XmlNode>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }

        Self {
            reader,
            line_starts,
            stack: Vec::new(),
        }
    }

    /// Convert a byte offset into a 1-based line number.
    fn line_at(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut prolog: Vec<XmlNode> = Vec::new();
        let mut epilog: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = self.reader.buffer_position() as usize;
            let line = self.line_at(event_start);

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    if self.stack.is_empty() && root.is_some() {
                        return Err(Error::MultipleRoots { line });
                    }
                    self.handle_start(e, line)?;
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let element = self.close_element(&end_name)?;

                    if self.stack.is_empty() {
                        root = Some(element);
                    } else {
                        self.push_child(XmlNode::Element(element));
                    }
                }
                Ok(Event::Empty(e)) => {
                    if self.stack.is_empty() && root.is_some() {
                        return Err(Error::MultipleRoots { line });
                    }
                    self.handle_start(e, line)?;
                    let node = self.stack.pop().expect("empty element just pushed");
                    let element = XmlElement {
                        name: node.name,
                        attributes: node.attributes,
                        children: node.children,
                        line: node.line,
                    };

                    if self.stack.is_empty() {
                        root = Some(element);
                    } else {
                        self.push_child(XmlNode::Element(element));
                    }
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(e, line, root.is_some())?;
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(e, line);
                }
                Ok(Event::Comment(e)) => {
                    let content = String::from_utf8_lossy(e.as_ref()).to_string();
                    let node = XmlNode::Comment { content, line };
                    if self.stack.is_empty() {
                        if root.is_none() {
                            prolog.push(node);
                        } else {
                            epilog.push(node);
                        }
                    } else {
                        self.push_child(node);
                    }
                }
                Ok(Event::PI(e)) => {
                    let node = self.handle_pi(&e, line);
                    if self.stack.is_empty() {
                        if root.is_none() {
                            prolog.push(node);
                        } else {
                            epilog.push(node);
                        }
                    } else {
                        self.push_child(node);
                    }
                }
                Ok(Event::Decl(_) | Event::DocType(_)) => {
                    // XML declaration and DOCTYPE carry no diffable content
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: self.reader.error_position(),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.name),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;

        Ok(XmlDocument {
            prolog,
            root,
            epilog,
        })
    }

    fn handle_start(&mut self, e: BytesStart<'_>, line: usize) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result?;
            let attr_name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: self.reader.buffer_position(),
            })?;
            attributes.push(XmlAttribute {
                name: attr_name,
                value: value.into_owned(),
            });
        }

        self.stack.push(BuildNode {
            name,
            attributes,
            line,
            children: Vec::new(),
        });

        Ok(())
    }

    fn close_element(&mut self, end_name: &str) -> Result<XmlElement> {
        let node = self.stack.pop().ok_or_else(|| Error::XmlSyntax {
            message: format!("Unexpected closing tag </{}>", end_name),
            position: self.reader.buffer_position(),
        })?;

        if node.name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.name.clone(),
                found: end_name.to_string(),
                line: node.line,
            });
        }

        Ok(XmlElement {
            name: node.name,
            attributes: node.attributes,
            children: node.children,
            line: node.line,
        })
    }

    fn handle_text(&mut self, e: BytesText<'_>, line: usize, root_seen: bool) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: self.reader.buffer_position(),
        })?;

        if self.stack.is_empty() {
            // Whitespace between prolog/epilog items is not content
            if !text.trim().is_empty() {
                return Err(Error::ContentOutsideRoot {
                    kind: if root_seen {
                        "text after the root element".to_string()
                    } else {
                        "text before the root element".to_string()
                    },
                    line,
                });
            }
            return Ok(());
        }

        self.push_text(text.into_owned(), line);
        Ok(())
    }

    fn handle_cdata(&mut self, e: BytesCData<'_>, line: usize) {
        let text = String::from_utf8_lossy(e.as_ref()).to_string();
        if !self.stack.is_empty() {
            self.push_text(text, line);
        }
    }

    fn handle_pi(&self, e: &BytesPI<'_>, line: usize) -> XmlNode {
        let target = String::from_utf8_lossy(e.target()).to_string();
        let body = String::from_utf8_lossy(e.content()).to_string();
        XmlNode::ProcessingInstruction {
            target,
            body: body.trim_start().to_string(),
            line,
        }
    }

    /// Append a text fragment, coalescing with a preceding text sibling
    /// so CDATA boundaries do not split logical runs.
    fn push_text(&mut self, text: String, line: usize) {
        let node = self.stack.last_mut().expect("text inside an element");
        if let Some(XmlNode::Text { content, .. }) = node.children.last_mut() {
            content.push_str(&text);
        } else {
            node.children.push(XmlNode::Text {
                content: text,
                line,
            });
        }
    }

    fn push_child(&mut self, child: XmlNode) {
        self.stack
            .last_mut()
            .expect("child inside an element")
            .children
            .push(child);
    }
}

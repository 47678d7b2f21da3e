/*
 * builder.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Conversion from parsed XML into the diff tree.
 *
 * The builder mirrors the XML structure under a synthetic Document root:
 * element text becomes explicit Text children in document order,
 * whitespace-only text is dropped unless the enclosing element preserves
 * whitespace, and processing instructions flanking the root element
 * become children of the Document itself.
 */

use crate::config::DiffConfig;
use crate::node::{DiffTree, ElementData, NodeId, NodeKind};
use draftdiff_xml::{XmlDocument, XmlElement, XmlNode};
use tracing::warn;

/// Build a [`DiffTree`] from a parsed document.
///
/// Never fails: a node violating the input contract (empty element name,
/// empty PI target) is skipped and logged once per build.
pub fn build_diff_tree(doc: &XmlDocument, config: &DiffConfig) -> DiffTree {
    let mut builder = Builder {
        tree: DiffTree::new(),
        config,
        malformed_logged: false,
    };

    let root = builder.tree.root();
    for item in &doc.prolog {
        builder.add_document_item(root, item);
    }
    builder.add_element(root, &doc.root, false);
    for item in &doc.epilog {
        builder.add_document_item(root, item);
    }

    builder.tree
}

struct Builder<'a> {
    tree: DiffTree,
    config: &'a DiffConfig,
    malformed_logged: bool,
}

impl Builder<'_> {
    /// PIs outside the root element become Document children in source
    /// order; anything else out there carries no diffable content.
    fn add_document_item(&mut self, root: NodeId, item: &XmlNode) {
        if let XmlNode::ProcessingInstruction { target, body, line } = item {
            self.add_pi(root, target, body, *line);
        }
    }

    fn add_element(&mut self, parent: NodeId, element: &XmlElement, inherited_preserve: bool) {
        if element.name.is_empty() {
            self.log_malformed("element with empty tag name", element.line);
            return;
        }

        let preserve = inherited_preserve
            || self.config.preserves_whitespace(&element.name)
            || has_preserve_attribute(element);

        let mut data = ElementData::new(element.name.clone());
        for attr in &element.attributes {
            data.attributes.insert(attr.name.clone(), attr.value.clone());
        }

        let id = self
            .tree
            .push_child(parent, NodeKind::Element(data), element.line, preserve);

        for child in &element.children {
            match child {
                XmlNode::Element(e) => self.add_element(id, e, preserve),
                XmlNode::Text { content, line } => self.add_text(id, content, *line, preserve),
                XmlNode::Comment { content, line } => {
                    // Comment spacing is always significant
                    self.tree
                        .push_child(id, NodeKind::Comment(content.clone()), *line, true);
                }
                XmlNode::ProcessingInstruction { target, body, line } => {
                    self.add_pi(id, target, body, *line);
                }
            }
        }
    }

    fn add_text(&mut self, parent: NodeId, content: &str, line: usize, preserve: bool) {
        if !preserve && content.trim().is_empty() {
            return;
        }
        self.tree
            .push_child(parent, NodeKind::Text(content.to_string()), line, preserve);
    }

    fn add_pi(&mut self, parent: NodeId, target: &str, body: &str, line: usize) {
        if target.is_empty() {
            self.log_malformed("processing instruction with empty target", line);
            return;
        }
        self.tree.push_child(
            parent,
            NodeKind::ProcessingInstruction {
                target: target.to_string(),
                body: body.to_string(),
            },
            line,
            false,
        );
    }

    fn log_malformed(&mut self, reason: &str, line: usize) {
        if !self.malformed_logged {
            warn!(reason, line, "skipping malformed input node");
            self.malformed_logged = true;
        }
    }
}

fn has_preserve_attribute(element: &XmlElement) -> bool {
    element
        .get_attribute("xml:space")
        .or_else(|| element.get_attribute("space"))
        == Some("preserve")
}

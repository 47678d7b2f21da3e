/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Merged-tree rendering.
 *
 * Walks the reconciled left tree (which now also holds clones of the
 * inserted right subtrees) into a plain serialisable structure: every
 * node carries one of unchanged / left-only / right-only / renamed,
 * matched elements carry a per-attribute diff, and changed text
 * carries word-level spans from the alignment pass. Paragraphs render
 * as leaves over their flattened text, the same way the solver
 * compared them.
 */

use draftdiff_distance::{EditSpan, SpanKind, compute_edits, tokenize};
use draftdiff_tree::{DiffConfig, DiffTree, ElementData, Node, NodeId, NodeKind};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

/// Which side(s) of the diff a node or attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    Unchanged,
    LeftOnly,
    RightOnly,
    Renamed,
}

/// One run of text, attributed to a side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "side", content = "text")]
pub enum TextSpan {
    Equal(String),
    Left(String),
    Right(String),
}

/// One attribute of a matched or single-sided element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedAttribute {
    pub name: String,
    pub state: ChangeState,
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Typed content of a rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RenderedContent {
    Document,
    Element {
        tag: String,
        /// Set when the matched counterpart's tag differs and the
        /// equivalence table does not bless the pair.
        renamed_to: Option<String>,
        attributes: Vec<RenderedAttribute>,
    },
    Text {
        spans: Vec<TextSpan>,
    },
    Comment {
        spans: Vec<TextSpan>,
    },
    ProcessingInstruction {
        target: String,
        body: String,
    },
    Paragraph {
        spans: Vec<TextSpan>,
    },
}

/// A node of the rendered merged tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNode {
    pub state: ChangeState,
    /// 1-based source line (left side for surviving nodes, right side
    /// for inserted clones).
    pub line: usize,
    pub preserve_space: bool,
    pub content: RenderedContent,
    pub children: Vec<RenderedNode>,
}

/// Render the reconciled left tree.
///
/// Pure: rendering the same pair twice yields identical output.
pub fn render(left: &DiffTree, right: &DiffTree, config: &DiffConfig) -> RenderedNode {
    // Post-order over the left tree, paragraphs as leaves, so children
    // are always built before their parent.
    let mut order = Vec::with_capacity(left.len());
    let mut stack = vec![(left.root(), false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        stack.push((id, true));
        if !left.node(id).is_opaque() {
            for &child in left.node(id).children.iter().rev() {
                stack.push((child, false));
            }
        }
    }

    let mut built: FxHashMap<usize, Vec<RenderedNode>> = FxHashMap::default();
    let mut root_rendered = None;

    for id in order {
        let children = built.remove(&id.index()).unwrap_or_default();
        let rendered = render_node(left, right, config, id, children);

        match left.node(id).parent {
            Some(parent) if !left.node(parent).is_opaque() => {
                built.entry(parent.index()).or_default().push(rendered);
            }
            Some(_) => {}
            None => root_rendered = Some(rendered),
        }
    }

    root_rendered.expect("left tree has a root")
}

fn render_node(
    left: &DiffTree,
    right: &DiffTree,
    config: &DiffConfig,
    id: NodeId,
    children: Vec<RenderedNode>,
) -> RenderedNode {
    let node = left.node(id);
    let counterpart = node.matched.map(|m| right.node(m));

    let single_side = if node.deleted {
        Some(ChangeState::LeftOnly)
    } else if node.inserted {
        Some(ChangeState::RightOnly)
    } else if counterpart.is_none() {
        // Every non-synthetic node should be matched, deleted, or
        // inserted by now
        if !node.kind.is_synthetic() {
            debug!(node = id.index(), "unclassified node rendered as left-only");
        }
        match node.kind {
            NodeKind::Document => None,
            _ => Some(ChangeState::LeftOnly),
        }
    } else {
        None
    };

    let (state, content) = match &node.kind {
        NodeKind::Document => (ChangeState::Unchanged, RenderedContent::Document),

        NodeKind::Element(data) => render_element(data, single_side, counterpart, config),

        NodeKind::Text(text) => {
            let (state, spans) = sided_spans(text, single_side, counterpart.map(|c| match &c.kind {
                NodeKind::Text(t) => t.as_str(),
                _ => "",
            }));
            (state, RenderedContent::Text { spans })
        }

        NodeKind::Comment(text) => {
            let (state, spans) = sided_spans(text, single_side, counterpart.map(|c| match &c.kind {
                NodeKind::Comment(t) => t.as_str(),
                _ => "",
            }));
            (state, RenderedContent::Comment { spans })
        }

        NodeKind::ProcessingInstruction { target, body } => (
            single_side.unwrap_or(ChangeState::Unchanged),
            RenderedContent::ProcessingInstruction {
                target: target.clone(),
                body: body.clone(),
            },
        ),

        NodeKind::Paragraph => {
            let flat = left.flatten_text(id);
            let counterpart_flat = node
                .matched
                .map(|m| right.flatten_text(m));
            let (state, spans) =
                sided_spans(&flat, single_side, counterpart_flat.as_deref());
            (state, RenderedContent::Paragraph { spans })
        }
    };

    RenderedNode {
        state,
        line: node.line,
        preserve_space: node.preserve_space,
        content,
        children,
    }
}

fn render_element(
    data: &ElementData,
    single_side: Option<ChangeState>,
    counterpart: Option<&Node>,
    config: &DiffConfig,
) -> (ChangeState, RenderedContent) {
    if let Some(state) = single_side {
        return (
            state,
            RenderedContent::Element {
                tag: data.tag.clone(),
                renamed_to: None,
                attributes: plain_attributes(data, state),
            },
        );
    }

    let Some(NodeKind::Element(other)) = counterpart.map(|c| &c.kind) else {
        // Matched across variants: the solver forbids this; degrade
        return (
            ChangeState::LeftOnly,
            RenderedContent::Element {
                tag: data.tag.clone(),
                renamed_to: None,
                attributes: plain_attributes(data, ChangeState::LeftOnly),
            },
        );
    };

    let renamed_to = if data.tag == other.tag || config.tags_equivalent(&data.tag, &other.tag) {
        None
    } else {
        Some(other.tag.clone())
    };
    let state = if renamed_to.is_some() {
        ChangeState::Renamed
    } else {
        ChangeState::Unchanged
    };

    (
        state,
        RenderedContent::Element {
            tag: data.tag.clone(),
            renamed_to,
            attributes: diff_attributes(data, other),
        },
    )
}

/// Spans and state for text-bearing content.
fn sided_spans(
    text: &str,
    single_side: Option<ChangeState>,
    counterpart: Option<&str>,
) -> (ChangeState, Vec<TextSpan>) {
    match single_side {
        Some(ChangeState::LeftOnly) => {
            (ChangeState::LeftOnly, vec![TextSpan::Left(text.to_string())])
        }
        Some(state) => (state, vec![TextSpan::Right(text.to_string())]),
        None => match counterpart {
            Some(other) if other != text => (ChangeState::Renamed, word_spans(text, other)),
            _ => (ChangeState::Unchanged, vec![TextSpan::Equal(text.to_string())]),
        },
    }
}

/// Word-level spans between two text fragments.
fn word_spans(left_text: &str, right_text: &str) -> Vec<TextSpan> {
    let left_tokens = tokenize(left_text);
    let right_tokens = tokenize(right_text);
    let edits: Vec<EditSpan> = compute_edits(&left_tokens, &right_tokens);

    edits
        .into_iter()
        .map(|span| match span.kind {
            SpanKind::Equal => TextSpan::Equal(left_tokens[span.left].concat()),
            SpanKind::Remove => TextSpan::Left(left_tokens[span.left].concat()),
            SpanKind::Insert => TextSpan::Right(right_tokens[span.right].concat()),
        })
        .collect()
}

/// Attribute diff for a matched element pair: left attributes in
/// insertion order, then right-only attributes.
fn diff_attributes(left_el: &ElementData, right_el: &ElementData) -> Vec<RenderedAttribute> {
    let mut out = Vec::with_capacity(left_el.attributes.len() + right_el.attributes.len());

    for (name, value) in &left_el.attributes {
        let entry = match right_el.attributes.get(name) {
            Some(other) if other == value => RenderedAttribute {
                name: name.clone(),
                state: ChangeState::Unchanged,
                left: Some(value.clone()),
                right: Some(other.clone()),
            },
            Some(other) => RenderedAttribute {
                name: name.clone(),
                state: ChangeState::Renamed,
                left: Some(value.clone()),
                right: Some(other.clone()),
            },
            None => RenderedAttribute {
                name: name.clone(),
                state: ChangeState::LeftOnly,
                left: Some(value.clone()),
                right: None,
            },
        };
        out.push(entry);
    }

    for (name, value) in &right_el.attributes {
        if !left_el.attributes.contains_key(name) {
            out.push(RenderedAttribute {
                name: name.clone(),
                state: ChangeState::RightOnly,
                left: None,
                right: Some(value.clone()),
            });
        }
    }

    out
}

fn plain_attributes(el: &ElementData, state: ChangeState) -> Vec<RenderedAttribute> {
    el.attributes
        .iter()
        .map(|(name, value)| {
            let (left, right) = match state {
                ChangeState::RightOnly => (None, Some(value.clone())),
                _ => (Some(value.clone()), None),
            };
            RenderedAttribute {
                name: name.clone(),
                state,
                left,
                right,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_edits;
    use draftdiff_distance::compute_edit_script;
    use draftdiff_tree::{add_paragraphs, build_diff_tree};
    use draftdiff_xml::parse;

    fn rendered(left_xml: &str, right_xml: &str, config: &DiffConfig) -> RenderedNode {
        let mut left = build_diff_tree(&parse(left_xml).unwrap(), config);
        let mut right = build_diff_tree(&parse(right_xml).unwrap(), config);
        if !config.raw {
            add_paragraphs(&mut left, config);
            add_paragraphs(&mut right, config);
        }
        let script = compute_edit_script(&left, &right, config);
        apply_edits(&mut left, &mut right, &script, config);
        render(&left, &right, config)
    }

    fn raw_config() -> DiffConfig {
        DiffConfig {
            raw: true,
            ..DiffConfig::default()
        }
    }

    #[test]
    fn test_unchanged_tree_renders_unchanged() {
        let root = rendered("<a><b/></a>", "<a><b/></a>", &raw_config());

        assert_eq!(root.state, ChangeState::Unchanged);
        assert!(matches!(root.content, RenderedContent::Document));
        let a = &root.children[0];
        assert_eq!(a.state, ChangeState::Unchanged);
        assert_eq!(a.children[0].state, ChangeState::Unchanged);
    }

    #[test]
    fn test_text_rename_spans() {
        let root = rendered("<t>foo</t>", "<t>bar</t>", &raw_config());

        let t = &root.children[0];
        assert_eq!(t.state, ChangeState::Unchanged);
        let text = &t.children[0];
        assert_eq!(text.state, ChangeState::Renamed);
        match &text.content {
            RenderedContent::Text { spans } => {
                assert_eq!(
                    spans,
                    &vec![
                        TextSpan::Left("foo".to_string()),
                        TextSpan::Right("bar".to_string()),
                    ]
                );
            }
            other => panic!("Expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_add_remove_keep() {
        let root = rendered(
            r#"<e a="1" b="2"/>"#,
            r#"<e a="1" c="2"/>"#,
            &raw_config(),
        );

        let e = &root.children[0];
        assert_eq!(e.state, ChangeState::Unchanged);
        let RenderedContent::Element { attributes, .. } = &e.content else {
            panic!("Expected element content");
        };

        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].name, "a");
        assert_eq!(attributes[0].state, ChangeState::Unchanged);
        assert_eq!(attributes[1].name, "b");
        assert_eq!(attributes[1].state, ChangeState::LeftOnly);
        assert_eq!(attributes[2].name, "c");
        assert_eq!(attributes[2].state, ChangeState::RightOnly);
    }

    #[test]
    fn test_attribute_value_change_is_pair() {
        let root = rendered(r#"<e a="1"/>"#, r#"<e a="2"/>"#, &raw_config());

        let RenderedContent::Element { attributes, .. } = &root.children[0].content else {
            panic!("Expected element content");
        };
        assert_eq!(attributes[0].state, ChangeState::Renamed);
        assert_eq!(attributes[0].left.as_deref(), Some("1"));
        assert_eq!(attributes[0].right.as_deref(), Some("2"));
    }

    #[test]
    fn test_deleted_subtree_marked_left_only() {
        let root = rendered("<r><a><x/></a></r>", "<r/>", &raw_config());

        let r = &root.children[0];
        let a = &r.children[0];
        assert_eq!(a.state, ChangeState::LeftOnly);
        assert_eq!(a.children[0].state, ChangeState::LeftOnly);
    }

    #[test]
    fn test_inserted_subtree_marked_right_only() {
        let root = rendered("<r/>", "<r><a>new</a></r>", &raw_config());

        let r = &root.children[0];
        let a = &r.children[0];
        assert_eq!(a.state, ChangeState::RightOnly);
        match &a.children[0].content {
            RenderedContent::Text { spans } => {
                assert_eq!(spans, &vec![TextSpan::Right("new".to_string())]);
            }
            other => panic!("Expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_equivalent_tags_render_unchanged() {
        let config = DiffConfig::default();
        let root = rendered("<list><t>x</t></list>", "<ul><li>x</li></ul>", &config);

        let list = &root.children[0];
        assert_eq!(list.state, ChangeState::Unchanged);
        let RenderedContent::Element { tag, renamed_to, .. } = &list.content else {
            panic!("Expected element content");
        };
        assert_eq!(tag, "list");
        assert!(renamed_to.is_none());
    }

    #[test]
    fn test_paragraph_word_diff() {
        let config = DiffConfig::default();
        let root = rendered(
            "<t>the quick brown fox jumps over the lazy dog today</t>",
            "<t>the quick brown fox leaps over the lazy dog today</t>",
            &config,
        );

        let t = &root.children[0];
        let paragraph = &t.children[0];
        assert_eq!(paragraph.state, ChangeState::Renamed);
        let RenderedContent::Paragraph { spans } = &paragraph.content else {
            panic!("Expected paragraph content");
        };

        let left_text: String = spans
            .iter()
            .filter_map(|s| match s {
                TextSpan::Left(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        let right_text: String = spans
            .iter()
            .filter_map(|s| match s {
                TextSpan::Right(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert!(left_text.contains("jumps"));
        assert!(right_text.contains("leaps"));

        // Paragraphs are leaves in the rendered tree
        assert!(paragraph.children.is_empty());
    }

    #[test]
    fn test_preserve_space_flag_carried() {
        let root = rendered(
            "<artwork>  a  \n</artwork>",
            "<artwork>  b  \n</artwork>",
            &raw_config(),
        );

        let artwork = &root.children[0];
        assert!(artwork.preserve_space);
        assert!(artwork.children[0].preserve_space);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let config = DiffConfig::default();
        let first = rendered(
            "<r><t>some prose here</t><t>gone</t></r>",
            "<r><t>some changed prose here</t><t>fresh</t></r>",
            &config,
        );
        let second = rendered(
            "<r><t>some prose here</t><t>gone</t></r>",
            "<r><t>some changed prose here</t><t>fresh</t></r>",
            &config,
        );

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_comment_diff_spans() {
        let root = rendered(
            "<r><!-- old note --></r>",
            "<r><!-- new note --></r>",
            &raw_config(),
        );

        let r = &root.children[0];
        let comment = &r.children[0];
        assert_eq!(comment.state, ChangeState::Renamed);
        assert!(matches!(&comment.content, RenderedContent::Comment { spans } if spans.len() > 1));
    }

    #[test]
    fn test_pi_rendered() {
        let root = rendered("<?rfc toc=\"yes\"?><r/>", "<?rfc toc=\"yes\"?><r/>", &raw_config());

        let pi = &root.children[0];
        assert_eq!(pi.state, ChangeState::Unchanged);
        assert!(matches!(
            &pi.content,
            RenderedContent::ProcessingInstruction { target, body }
                if target == "rfc" && body == "toc=\"yes\""
        ));
    }
}

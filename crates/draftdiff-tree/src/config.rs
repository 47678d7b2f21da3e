/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Diff configuration context.
 *
 * Every pass takes a &DiffConfig parameter instead of consulting
 * process-wide state, so tests can vary flags and tables per case. The
 * policy tables are plain data: vocabulary revisions move elements
 * between classes, and callers can override the defaults.
 */

use serde::{Deserialize, Serialize};

/// Folding behaviour for a block element's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldClass {
    /// One paragraph wraps all children.
    Always,
    /// Runs of inline content fold into paragraphs; block children pass
    /// through unchanged.
    Mixed,
    /// No folding.
    Never,
}

/// Which tags fold which way, and which tags count as inline content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphPolicy {
    /// Elements whose entire content is one paragraph.
    pub always: Vec<String>,

    /// Elements that may hold both inline runs and nested blocks.
    pub mixed: Vec<String>,

    /// Elements that are themselves inline content.
    pub inline: Vec<String>,
}

impl ParagraphPolicy {
    pub fn classify(&self, tag: &str) -> FoldClass {
        if self.always.iter().any(|t| t == tag) {
            FoldClass::Always
        } else if self.mixed.iter().any(|t| t == tag) {
            FoldClass::Mixed
        } else {
            FoldClass::Never
        }
    }

    pub fn is_inline(&self, tag: &str) -> bool {
        self.inline.iter().any(|t| t == tag)
    }
}

impl Default for ParagraphPolicy {
    fn default() -> Self {
        fn strings(tags: &[&str]) -> Vec<String> {
            tags.iter().map(|t| (*t).to_string()).collect()
        }

        Self {
            // Containers whose content is prose: one paragraph each.
            always: strings(&[
                "annotation",
                "area",
                "artwork",
                "c",
                "city",
                "code",
                "country",
                "dd",
                "dt",
                "email",
                "facsimile",
                "keyword",
                "li",
                "organization",
                "phone",
                "postalline",
                "postamble",
                "preamble",
                "refcontent",
                "region",
                "sourcecode",
                "spanx",
                "street",
                "t",
                "title",
                "ttcol",
                "uri",
                "workgroup",
            ]),
            // Containers that interleave prose with nested blocks.
            mixed: strings(&["abstract", "aside", "blockquote", "note", "td", "th"]),
            // Inline markup that joins the surrounding text run.
            inline: strings(&[
                "bcp14", "br", "cref", "em", "eref", "iref", "relref", "strong", "sub", "sup",
                "tt", "vspace", "xref",
            ]),
        }
    }
}

/// Context threaded through tree building, folding, the solver, and
/// reconciliation.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Diff the raw XML structure: no paragraph folding, no tag
    /// equivalence.
    pub raw: bool,

    /// Emit the edit script and residual-insert diagnostics.
    pub debug: bool,

    /// Symmetric pairs of tags treated as the same label, bridging
    /// historical and current vocabulary spellings.
    pub tag_equivalence: Vec<(String, String)>,

    /// Paragraph folding policy table.
    pub paragraph_policy: ParagraphPolicy,

    /// Tags whose internal spacing is significant.
    pub preserve_space_tags: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        fn pairs(table: &[(&str, &str)]) -> Vec<(String, String)> {
            table
                .iter()
                .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
                .collect()
        }

        Self {
            raw: false,
            debug: false,
            tag_equivalence: pairs(&[
                ("list", "ol"),
                ("list", "ul"),
                ("list", "dl"),
                ("t", "li"),
                ("table", "texttable"),
            ]),
            paragraph_policy: ParagraphPolicy::default(),
            preserve_space_tags: vec!["artwork".to_string(), "sourcecode".to_string()],
        }
    }
}

impl DiffConfig {
    /// Whether two element tags compare as the same label.
    ///
    /// Identical tags always do. The equivalence table is consulted
    /// symmetrically, and not at all in raw mode.
    pub fn tags_equivalent(&self, left: &str, right: &str) -> bool {
        if left == right {
            return true;
        }
        if self.raw {
            return false;
        }
        self.tag_equivalence
            .iter()
            .any(|(a, b)| (a == left && b == right) || (a == right && b == left))
    }

    /// Whether `tag` is in the fixed whitespace-preserving set.
    pub fn preserves_whitespace(&self, tag: &str) -> bool {
        self.preserve_space_tags.iter().any(|t| t == tag)
    }
}

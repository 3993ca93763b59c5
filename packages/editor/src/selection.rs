use markup_parser::{Document, NodeId};
use serde::{Deserialize, Serialize};

use crate::errors::{EditorError, EditorResult};

/// One end of a selection: a node plus an offset into it.
///
/// Offsets into text nodes count characters; offsets into elements count
/// children. Anchors are lookups, not owning references; a mutation that
/// detaches the node invalidates the anchor and the engine recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub node: NodeId,
    pub offset: usize,
}

impl Anchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: Anchor,
    pub end: Anchor,
}

impl Selection {
    pub fn new(start: Anchor, end: Anchor) -> Self {
        Self { start, end }
    }

    pub fn caret(anchor: Anchor) -> Self {
        Self {
            start: anchor,
            end: anchor,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Return the selection with anchors in tree order. Anchors given
    /// backwards are swapped, never rejected.
    pub fn ordered(&self, doc: &Document) -> Selection {
        if anchor_position(doc, &self.start) <= anchor_position(doc, &self.end) {
            *self
        } else {
            Selection {
                start: self.end,
                end: self.start,
            }
        }
    }

    /// Validate that both anchors address live, in-bounds positions.
    pub fn validate(&self, doc: &Document) -> EditorResult<()> {
        for anchor in [&self.start, &self.end] {
            if !doc.is_attached(anchor.node) {
                return Err(EditorError::NoSelection);
            }
            let len = doc.len_of(anchor.node);
            if anchor.offset > len {
                return Err(EditorError::InvalidOffset {
                    offset: anchor.offset,
                    len,
                });
            }
        }
        Ok(())
    }
}

/// Tree-order sort key for an anchor: the node's root path extended with the
/// offset.
fn anchor_position(doc: &Document, anchor: &Anchor) -> Vec<usize> {
    let mut position = doc.path(anchor.node);
    position.push(anchor.offset);
    position
}

/// Resolve a host-facing address (element id, optional child index, offset)
/// into an anchor.
///
/// With a child index, the offset addresses the identified element's child at
/// that index. Without one, the anchor lands in the element's first text
/// descendant when it has one, otherwise in the element itself with a
/// child-index offset.
pub fn resolve_address(
    doc: &Document,
    id: &str,
    offset: usize,
    child_index: Option<usize>,
) -> Option<Anchor> {
    let element = doc.element_by_id(id)?;
    let node = match child_index {
        Some(index) => *doc.children(element).get(index)?,
        None => doc.first_text_descendant(element).unwrap_or(element),
    };
    if offset > doc.len_of(node) {
        return None;
    }
    Some(Anchor::new(node, offset))
}

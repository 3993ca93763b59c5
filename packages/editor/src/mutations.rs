//! Atomic tree operations the editing commands compose from.
//!
//! No primitive drops text: content removed from one node by a split or merge
//! reappears in a sibling. Splits keep the original attributes (including
//! `id`) on the left half; the right half is a fresh, id-less element.

use markup_parser::{Document, NodeId, Tag};

use crate::errors::{EditorError, EditorResult};
use crate::selection::{Anchor, Selection};

/// A text node intersected by a selection, with the local character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Split a text node at a character offset. The original keeps the head, a new
/// sibling after it takes the tail.
pub fn split_text(doc: &mut Document, node: NodeId, offset: usize) -> NodeId {
    let tail = match doc.text_mut(node) {
        Some(text) => {
            let byte = byte_offset(text, offset);
            text.split_off(byte)
        }
        None => String::new(),
    };
    let right = doc.create_text(tail);
    doc.insert_after(node, right);
    right
}

/// Split an element at a child index. Children at `index..` move to a new
/// right sibling carrying the same tag and attributes minus `id`.
pub fn split_element(doc: &mut Document, node: NodeId, index: usize) -> NodeId {
    let Some(tag) = doc.tag(node) else {
        return node;
    };
    let mut attrs = doc.attrs(node).cloned().unwrap_or_default();
    attrs.id = None;
    let right = doc.create_element_with(tag, attrs);
    doc.insert_after(node, right);
    let tail: Vec<NodeId> = doc.children(node).get(index..).unwrap_or(&[]).to_vec();
    for child in tail {
        doc.append(right, child);
    }
    right
}

/// Split every ancestor of `anchor` strictly below `boundary`, so the split
/// point becomes a child gap of `boundary`. Returns the child index in
/// `boundary` where the right side begins.
///
/// Splits at a node edge shift the index instead of manufacturing an empty
/// half.
pub fn split_upto(doc: &mut Document, anchor: Anchor, boundary: NodeId) -> EditorResult<usize> {
    let mut parent;
    let mut index;
    if doc.is_text(anchor.node) {
        let len = doc.len_of(anchor.node);
        let at = anchor.offset.min(len);
        let position = doc.index_of(anchor.node).ok_or(EditorError::NoSelection)?;
        index = if at == 0 {
            position
        } else if at == len {
            position + 1
        } else {
            split_text(doc, anchor.node, at);
            position + 1
        };
        parent = doc.parent(anchor.node).ok_or(EditorError::NoSelection)?;
    } else {
        parent = anchor.node;
        index = anchor.offset.min(doc.len_of(anchor.node));
    }
    while parent != boundary {
        let grandparent = doc.parent(parent).ok_or(EditorError::NoSelection)?;
        let position = doc.index_of(parent).ok_or(EditorError::NoSelection)?;
        if index == 0 {
            index = position;
        } else if index == doc.len_of(parent) {
            index = position + 1;
        } else {
            split_element(doc, parent, index);
            index = position + 1;
        }
        parent = grandparent;
    }
    Ok(index)
}

/// Merge `b` into `a`. Only same-tag elements merge; `b`'s children move to
/// the end of `a` and `b` is detached.
pub fn merge_elements(doc: &mut Document, a: NodeId, b: NodeId) -> EditorResult<NodeId> {
    let left = doc.tag(a);
    let right = doc.tag(b);
    match (left, right) {
        (Some(x), Some(y)) if x == y => {}
        _ => {
            return Err(EditorError::IncompatibleMerge {
                left: tag_label(left),
                right: tag_label(right),
            })
        }
    }
    let children: Vec<NodeId> = doc.children(b).to_vec();
    for child in children {
        doc.append(a, child);
    }
    doc.detach(b);
    merge_adjacent_text(doc, a);
    Ok(a)
}

fn tag_label(tag: Option<Tag>) -> String {
    tag.map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "#text".to_string())
}

/// Replace an element with its children, in place.
pub fn unwrap_element(doc: &mut Document, node: NodeId) {
    let Some(parent) = doc.parent(node) else {
        return;
    };
    let Some(mut index) = doc.index_of(node) else {
        return;
    };
    let children: Vec<NodeId> = doc.children(node).to_vec();
    doc.detach(node);
    for child in children {
        doc.insert(parent, index, child);
        index += 1;
    }
    merge_adjacent_text(doc, parent);
}

/// Collapse consecutive text-node children of `parent` into single runs.
pub fn merge_adjacent_text(doc: &mut Document, parent: NodeId) {
    loop {
        let children = doc.children(parent);
        let seam = children
            .windows(2)
            .position(|pair| doc.is_text(pair[0]) && doc.is_text(pair[1]));
        let Some(position) = seam else {
            return;
        };
        let first = doc.children(parent)[position];
        let second = doc.children(parent)[position + 1];
        let tail = doc.text(second).unwrap_or_default().to_string();
        if let Some(text) = doc.text_mut(first) {
            text.push_str(&tail);
        }
        doc.detach(second);
    }
}

/// Remove empty text nodes and childless inline wrappers under `node`,
/// bottom-up.
pub fn prune_empty(doc: &mut Document, node: NodeId) {
    let order = doc.descendants(node);
    for &n in order.iter().rev() {
        if n == node {
            continue;
        }
        let empty_text = doc.text(n).map(str::is_empty).unwrap_or(false);
        let empty_wrapper = doc
            .tag(n)
            .map(|t| t.is_format() && doc.children(n).is_empty())
            .unwrap_or(false);
        if empty_text || empty_wrapper {
            doc.detach(n);
        }
    }
}

/// Nearest block container of a node: its paragraph/heading, else the
/// enclosing list item, table cell, or blockquote.
pub fn nearest_block(doc: &Document, node: NodeId) -> NodeId {
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(tag) = doc.tag(n) {
            if tag.is_style() || matches!(tag, Tag::Li | Tag::Td | Tag::Blockquote) {
                return n;
            }
        }
        current = doc.parent(n);
    }
    node
}

/// Whether the subtree holds meaningful content (non-empty text or an image).
/// Placeholder `<br>`s do not count.
pub fn subtree_has_content(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node).into_iter().any(|n| {
        doc.text(n).map(|t| !t.is_empty()).unwrap_or(false) || doc.tag(n) == Some(Tag::Img)
    })
}

/// Detach `node` and then each emptied ancestor until content or the root is
/// reached.
pub fn remove_empty_upward(doc: &mut Document, node: NodeId) {
    let mut current = Some(node);
    while let Some(n) = current {
        if doc.parent(n).is_none() || subtree_has_content(doc, n) {
            break;
        }
        let parent = doc.parent(n);
        doc.detach(n);
        current = parent;
    }
}

/// Resolve an element anchor onto the text node a user would see at that
/// position. Text anchors pass through.
pub fn normalize_to_text(doc: &Document, anchor: Anchor, toward_end: bool) -> Anchor {
    if doc.is_text(anchor.node) {
        return anchor;
    }
    let children = doc.children(anchor.node).to_vec();
    if toward_end {
        let upper = anchor.offset.min(children.len());
        for &child in children[..upper].iter().rev() {
            if let Some(text) = last_text_descendant(doc, child) {
                return Anchor::new(text, doc.len_of(text));
            }
        }
    } else {
        for &child in children.get(anchor.offset..).unwrap_or(&[]) {
            if let Some(text) = doc.first_text_descendant(child) {
                return Anchor::new(text, 0);
            }
        }
    }
    anchor
}

pub fn last_text_descendant(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.descendants(node)
        .into_iter()
        .filter(|&n| doc.is_text(n))
        .last()
}

/// The text runs a selection touches, in document order, with per-node
/// character ranges.
pub fn text_runs(doc: &Document, sel: &Selection) -> Vec<TextRun> {
    let sel = sel.ordered(doc);
    let start = normalize_to_text(doc, sel.start, false);
    let end = normalize_to_text(doc, sel.end, true);
    if !doc.is_text(start.node) || !doc.is_text(end.node) {
        return Vec::new();
    }
    let mut runs = Vec::new();
    let mut seen_start = false;
    for n in doc.descendants(doc.root()) {
        if !doc.is_text(n) {
            continue;
        }
        let len = doc.len_of(n);
        if !seen_start {
            if n != start.node {
                continue;
            }
            seen_start = true;
            let upper = if n == end.node { end.offset } else { len };
            if upper > start.offset {
                runs.push(TextRun {
                    node: n,
                    start: start.offset,
                    end: upper,
                });
            }
            if n == end.node {
                break;
            }
            continue;
        }
        if n == end.node {
            if end.offset > 0 {
                runs.push(TextRun {
                    node: n,
                    start: 0,
                    end: end.offset,
                });
            }
            break;
        }
        if len > 0 {
            runs.push(TextRun {
                node: n,
                start: 0,
                end: len,
            });
        }
    }
    runs
}

/// Delete the characters a range covers and rejoin the structure around it.
/// Returns the collapsed caret left behind.
pub fn delete_range(doc: &mut Document, sel: &Selection) -> EditorResult<Anchor> {
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    if sel.is_collapsed() {
        return Ok(sel.start);
    }
    let runs = text_runs(doc, &sel);
    let Some(first) = runs.first().copied() else {
        return Ok(sel.start);
    };
    for run in &runs {
        remove_chars(doc, run.node, run.start, run.end);
    }
    let last = runs[runs.len() - 1].node;
    if first.node != last {
        // Void elements sitting strictly inside the range go too.
        let order = doc.descendants(doc.root());
        let mut inside = false;
        for n in order {
            if n == first.node {
                inside = true;
                continue;
            }
            if n == last {
                break;
            }
            if inside && doc.tag(n).map(Tag::is_void).unwrap_or(false) {
                doc.detach(n);
            }
        }
    }
    let start_block = nearest_block(doc, first.node);
    let end_block = nearest_block(doc, runs[runs.len() - 1].node);
    if start_block != end_block {
        // Blocks other than the first lose everything in range; remember them
        // before the join moves their remainders around.
        let mut emptied: Vec<NodeId> = runs
            .iter()
            .skip(1)
            .map(|run| nearest_block(doc, run.node))
            .filter(|&block| block != start_block && block != end_block)
            .collect();
        emptied.dedup();
        let tail: Vec<NodeId> = doc.children(end_block).to_vec();
        for child in tail {
            doc.append(start_block, child);
        }
        remove_empty_upward(doc, end_block);
        for block in emptied {
            if doc.is_attached(block) && !subtree_has_content(doc, block) {
                remove_empty_upward(doc, block);
            }
        }
    }
    merge_adjacent_text(doc, start_block);
    // The start text node stays even when emptied; callers that need a clean
    // tree prune it, and the enter-split relies on it to keep its wrapper.
    if doc.is_attached(first.node) {
        Ok(Anchor::new(first.node, first.start))
    } else {
        Ok(Anchor::new(start_block, 0))
    }
}

/// Remove characters `[start, end)` from a text node.
pub fn remove_chars(doc: &mut Document, node: NodeId, start: usize, end: usize) {
    if let Some(text) = doc.text_mut(node) {
        let lower = byte_offset(text, start);
        let upper = byte_offset(text, end);
        text.replace_range(lower..upper, "");
    }
}

/// Byte index of the `offset`th character, clamped to the end.
pub fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_parser::{parse, serialize};

    fn first_text(doc: &Document, id: &str) -> NodeId {
        let el = doc.element_by_id(id).unwrap();
        doc.first_text_descendant(el).unwrap()
    }

    #[test]
    fn test_split_text() {
        let mut doc = parse("<p id=\"p\">Hello world</p>").unwrap();
        let text = first_text(&doc, "p");
        split_text(&mut doc, text, 5);
        assert_eq!(serialize(&doc), "<p id=\"p\">Hello world</p>");
        let p = doc.element_by_id("p").unwrap();
        assert_eq!(doc.children(p).len(), 2);
        assert_eq!(doc.text(doc.children(p)[1]), Some(" world"));
    }

    #[test]
    fn test_split_upto_block() {
        let mut doc = parse("<p id=\"p\">Hello <b>big</b> world</p>").unwrap();
        let text = first_text(&doc, "p");
        let p = doc.element_by_id("p").unwrap();
        let root = doc.root();
        let index = split_upto(&mut doc, Anchor::new(text, 3), root).unwrap();
        assert_eq!(index, 1);
        assert_eq!(serialize(&doc), "<p id=\"p\">Hel</p><p>lo <b>big</b> world</p>");
        assert_eq!(doc.attrs(p).and_then(|a| a.id.as_deref()), Some("p"));
    }

    #[test]
    fn test_split_upto_at_edges_creates_no_empty_halves() {
        let mut doc = parse("<p id=\"p\">Hello</p>").unwrap();
        let text = first_text(&doc, "p");
        let root = doc.root();
        assert_eq!(split_upto(&mut doc, Anchor::new(text, 0), root).unwrap(), 0);
        assert_eq!(split_upto(&mut doc, Anchor::new(text, 5), root).unwrap(), 1);
        assert_eq!(serialize(&doc), "<p id=\"p\">Hello</p>");
    }

    #[test]
    fn test_merge_same_tag_only() {
        let mut doc = parse("<p id=\"a\">one</p><h1 id=\"b\">two</h1>").unwrap();
        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();
        let err = merge_elements(&mut doc, a, b).unwrap_err();
        assert!(matches!(err, EditorError::IncompatibleMerge { .. }));
        assert_eq!(serialize(&doc), "<p id=\"a\">one</p><h1 id=\"b\">two</h1>");
    }

    #[test]
    fn test_merge_joins_text() {
        let mut doc = parse("<p id=\"a\">one</p><p id=\"b\">two</p>").unwrap();
        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();
        merge_elements(&mut doc, a, b).unwrap();
        assert_eq!(serialize(&doc), "<p id=\"a\">onetwo</p>");
        assert_eq!(doc.children(a).len(), 1);
    }

    #[test]
    fn test_delete_range_same_node() {
        let mut doc = parse("<p id=\"p\">Hello world</p>").unwrap();
        let text = first_text(&doc, "p");
        let sel = Selection::new(Anchor::new(text, 5), Anchor::new(text, 11));
        let caret = delete_range(&mut doc, &sel).unwrap();
        assert_eq!(serialize(&doc), "<p id=\"p\">Hello</p>");
        assert_eq!(caret, Anchor::new(text, 5));
    }

    #[test]
    fn test_delete_range_across_blocks() {
        let mut doc = parse("<p id=\"a\">Hello there</p><p id=\"b\">old world</p>").unwrap();
        let start = first_text(&doc, "a");
        let end = first_text(&doc, "b");
        let sel = Selection::new(Anchor::new(start, 5), Anchor::new(end, 3));
        delete_range(&mut doc, &sel).unwrap();
        assert_eq!(serialize(&doc), "<p id=\"a\">Hello world</p>");
    }

    #[test]
    fn test_prune_empty_wrappers() {
        let mut doc = parse("<p id=\"p\">a<b></b>c</p>").unwrap();
        let p = doc.element_by_id("p").unwrap();
        prune_empty(&mut doc, p);
        merge_adjacent_text(&mut doc, p);
        assert_eq!(serialize(&doc), "<p id=\"p\">ac</p>");
    }
}

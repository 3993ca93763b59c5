//! Block style renames, blockquote indenting, and list membership.

use markup_parser::{Document, NodeId, Tag};

use crate::errors::{EditorError, EditorResult};
use crate::mutations::{nearest_block, text_runs, unwrap_element};
use crate::selection::Selection;

/// Nearest paragraph/heading ancestor of a node, if any.
pub fn nearest_style_block(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if doc.tag(n).map(Tag::is_style).unwrap_or(false) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Nearest list-item ancestor of a node, if any.
pub fn enclosing_li(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if doc.tag(n) == Some(Tag::Li) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Blockquote nesting depth around a node.
pub fn quote_level(doc: &Document, node: NodeId) -> usize {
    doc.ancestors(node)
        .into_iter()
        .filter(|&n| doc.tag(n) == Some(Tag::Blockquote))
        .count()
}

/// Rename every distinct paragraph/heading block the selection touches to
/// `target`. The rename produces a fresh element: the old block's `id` is not
/// carried over. Descendants are untouched.
pub fn replace_style(doc: &mut Document, sel: &Selection, target: Tag) -> EditorResult<Selection> {
    if !target.is_style() {
        return Err(EditorError::UnknownCommand(format!(
            "style <{}>",
            target.as_str()
        )));
    }
    let sel = sel.ordered(doc);
    sel.validate(doc)?;

    let mut blocks: Vec<NodeId> = if sel.is_collapsed() {
        nearest_style_block(doc, sel.start.node).into_iter().collect()
    } else {
        text_runs(doc, &sel)
            .iter()
            .filter_map(|run| nearest_style_block(doc, run.node))
            .collect()
    };
    blocks.dedup();

    for block in blocks {
        if doc.tag(block) == Some(target) {
            continue;
        }
        let fresh = doc.create_element(target);
        doc.insert_before(block, fresh);
        let children: Vec<NodeId> = doc.children(block).to_vec();
        for child in children {
            doc.append(fresh, child);
        }
        doc.detach(block);
    }
    Ok(sel)
}

/// Wrap the selection's block in one more blockquote level.
pub fn indent(doc: &mut Document, sel: &Selection) -> EditorResult<Selection> {
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    let block = nearest_block(doc, sel.start.node);
    if doc.parent(block).is_none() {
        return Ok(sel);
    }
    let quote = doc.create_element(Tag::Blockquote);
    doc.insert_before(block, quote);
    doc.append(quote, block);
    Ok(sel)
}

/// Remove the innermost blockquote around the selection's block. At level
/// zero this is a no-op.
pub fn outdent(doc: &mut Document, sel: &Selection) -> EditorResult<Selection> {
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    let block = nearest_block(doc, sel.start.node);
    let mut current = Some(block);
    let quote = loop {
        let Some(n) = current else {
            return Ok(sel);
        };
        if doc.tag(n) == Some(Tag::Blockquote) {
            break n;
        }
        current = doc.parent(n);
    };
    unwrap_element(doc, quote);
    Ok(sel)
}

/// Toggle list membership of the selection's block.
///
/// Outside a list the block is wrapped in an item of a new (or adjacent
/// same-type) list. Inside a list of the same type the item is unwrapped in
/// place; a list left without items dissolves. Inside a list of the other
/// type the item moves into a new adjacent list of the requested type,
/// splitting the host list around it.
pub fn toggle_list_item(doc: &mut Document, sel: &Selection, kind: Tag) -> EditorResult<Selection> {
    if !kind.is_list() {
        return Err(EditorError::UnknownCommand(format!(
            "list <{}>",
            kind.as_str()
        )));
    }
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    let block = nearest_block(doc, sel.start.node);

    let Some(li) = enclosing_li(doc, block) else {
        let previous = doc.prev_sibling(block);
        let item = doc.create_element(Tag::Li);
        match previous.filter(|&p| doc.tag(p) == Some(kind)) {
            Some(list) => {
                doc.append(list, item);
            }
            None => {
                let list = doc.create_element(kind);
                doc.insert_before(block, list);
                doc.append(list, item);
            }
        }
        doc.append(item, block);
        return Ok(sel);
    };

    let Some(list) = doc.parent(li).filter(|&l| doc.tag(l).map(Tag::is_list).unwrap_or(false))
    else {
        return Ok(sel);
    };

    if doc.tag(list) == Some(kind) {
        unwrap_element(doc, li);
        let has_items = doc
            .children(list)
            .iter()
            .any(|&c| doc.tag(c) == Some(Tag::Li));
        if !has_items {
            unwrap_element(doc, list);
        }
        return Ok(sel);
    }

    let index = doc.index_of(li).unwrap_or(0);
    if index + 1 < doc.children(list).len() {
        crate::mutations::split_element(doc, list, index + 1);
    }
    let moved = doc.create_element(kind);
    doc.insert_after(list, moved);
    doc.append(moved, li);
    if doc.children(list).is_empty() {
        doc.detach(list);
    }
    Ok(sel)
}

//! Inline format toggling (bold, italic, underline, strike, sub/sup, code).

use markup_parser::{Document, NodeId, Tag};
use serde::{Deserialize, Serialize};

use crate::errors::{EditorError, EditorResult};
use crate::mutations::{
    merge_adjacent_text, nearest_block, split_text, split_upto, text_runs, unwrap_element, TextRun,
};
use crate::selection::{Anchor, Selection};

/// Format coverage of a selection, per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatState {
    Applied,
    NotApplied,
    Mixed,
}

/// Nearest enclosing wrapper of `tag` around a node, stopping at the block
/// boundary.
pub fn wrapper_ancestor(doc: &Document, node: NodeId, tag: Tag) -> Option<NodeId> {
    let mut current = if doc.is_text(node) {
        doc.parent(node)
    } else {
        Some(node)
    };
    while let Some(n) = current {
        let t = doc.tag(n)?;
        if t == tag {
            return Some(n);
        }
        if t.is_block() {
            return None;
        }
        current = doc.parent(n);
    }
    None
}

/// Coverage of `tag` over the selection. Collapsed selections report the
/// state at the caret for toolbar reflection.
pub fn format_state(doc: &Document, sel: &Selection, tag: Tag) -> FormatState {
    let sel = sel.ordered(doc);
    if sel.is_collapsed() {
        return if wrapper_ancestor(doc, sel.start.node, tag).is_some() {
            FormatState::Applied
        } else {
            FormatState::NotApplied
        };
    }
    let runs = text_runs(doc, &sel);
    if runs.is_empty() {
        return FormatState::NotApplied;
    }
    let covered = runs
        .iter()
        .filter(|run| wrapper_ancestor(doc, run.node, tag).is_some())
        .count();
    if covered == runs.len() {
        FormatState::Applied
    } else if covered == 0 {
        FormatState::NotApplied
    } else {
        FormatState::Mixed
    }
}

/// Toggle an inline format over the selection.
///
/// The decision is made per touched block: a block whose selected portion is
/// fully covered has that portion unwrapped (splitting wrappers at the range
/// boundaries); any other block has its uncovered runs wrapped, nesting the
/// new wrapper inside existing inline wrappers. A collapsed caret inside a
/// wrapper of the kind unwraps that whole wrapper; a caret outside one leaves
/// the tree alone.
pub fn toggle_format(doc: &mut Document, sel: &Selection, tag: Tag) -> EditorResult<Selection> {
    if !tag.is_format() {
        return Err(EditorError::UnknownCommand(format!(
            "format <{}>",
            tag.as_str()
        )));
    }
    let sel = sel.ordered(doc);
    sel.validate(doc)?;

    if sel.is_collapsed() {
        if let Some(wrapper) = wrapper_ancestor(doc, sel.start.node, tag) {
            unwrap_element(doc, wrapper);
        }
        return Ok(reanchored(doc, &sel));
    }

    let runs = text_runs(doc, &sel);
    if runs.is_empty() {
        return Ok(sel);
    }

    let mut wrapped: Vec<NodeId> = Vec::new();
    for (block, block_runs) in group_by_block(doc, &runs) {
        let all_covered = block_runs
            .iter()
            .all(|run| wrapper_ancestor(doc, run.node, tag).is_some());
        for run in block_runs {
            if all_covered {
                unwrap_run(doc, run, tag)?;
            } else if wrapper_ancestor(doc, run.node, tag).is_none() {
                wrapped.push(wrap_run(doc, run, tag));
            }
        }
        merge_adjacent_text(doc, block);
    }

    if let (Some(&first), Some(&last)) = (wrapped.first(), wrapped.last()) {
        if let (Some(start), Some(end)) = (
            doc.first_text_descendant(first),
            doc.first_text_descendant(last),
        ) {
            return Ok(Selection::new(
                Anchor::new(start, 0),
                Anchor::new(end, doc.len_of(end)),
            ));
        }
    }
    Ok(reanchored(doc, &sel))
}

/// Runs grouped by their nearest block, in document order.
fn group_by_block(doc: &Document, runs: &[TextRun]) -> Vec<(NodeId, Vec<TextRun>)> {
    let mut groups: Vec<(NodeId, Vec<TextRun>)> = Vec::new();
    for &run in runs {
        let block = nearest_block(doc, run.node);
        match groups.last_mut() {
            Some((last, group)) if *last == block => group.push(run),
            _ => groups.push((block, vec![run])),
        }
    }
    groups
}

/// Unwrap the covered portion of one run: split its wrapper at the run
/// boundaries, then promote the isolated middle.
fn unwrap_run(doc: &mut Document, run: TextRun, tag: Tag) -> EditorResult<()> {
    let Some(wrapper) = wrapper_ancestor(doc, run.node, tag) else {
        return Ok(());
    };
    let Some(parent) = doc.parent(wrapper) else {
        return Ok(());
    };
    split_upto(doc, Anchor::new(run.node, run.end), parent)?;
    let index = split_upto(doc, Anchor::new(run.node, run.start), parent)?;
    if let Some(&middle) = doc.children(parent).get(index) {
        if doc.tag(middle) == Some(tag) {
            unwrap_element(doc, middle);
        }
    }
    Ok(())
}

/// Wrap the run's character range in a new element of `tag`, inside whatever
/// inline wrappers already surround it. Returns the wrapper.
fn wrap_run(doc: &mut Document, run: TextRun, tag: Tag) -> NodeId {
    let len = doc.len_of(run.node);
    if run.end < len {
        split_text(doc, run.node, run.end);
    }
    let target = if run.start > 0 {
        split_text(doc, run.node, run.start)
    } else {
        run.node
    };
    let wrapper = doc.create_element(tag);
    doc.insert_before(target, wrapper);
    doc.append(wrapper, target);
    wrapper
}

/// Best-effort remap of a selection whose nodes may have been split, merged,
/// or detached.
fn reanchored(doc: &Document, sel: &Selection) -> Selection {
    Selection::new(reanchor(doc, sel.start), reanchor(doc, sel.end))
}

fn reanchor(doc: &Document, anchor: Anchor) -> Anchor {
    if doc.is_attached(anchor.node) {
        Anchor::new(anchor.node, anchor.offset.min(doc.len_of(anchor.node)))
    } else {
        Anchor::new(doc.root(), 0)
    }
}

//! Enter handling inside list items.
//!
//! A caret at the edges of an item's content inserts an empty sibling item; a
//! caret in the middle splits the item, carrying inline formatting across the
//! split. Non-collapsed selections delete their content first and then split
//! at the resulting caret.

use markup_parser::{Document, NodeId, Tag};

use crate::errors::{EditorError, EditorResult};
use crate::mutations::{
    delete_range, last_text_descendant, normalize_to_text, split_element, split_text,
    subtree_has_content,
};
use crate::selection::{Anchor, Selection};
use crate::style::enclosing_li;

/// Marker kept in an inline wrapper a split would otherwise leave empty, so
/// the formatting is not silently lost.
pub const ZERO_WIDTH: char = '\u{200B}';

const NBSP: char = '\u{A0}';

pub fn list_enter(doc: &mut Document, sel: &Selection) -> EditorResult<Selection> {
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    let caret = if sel.is_collapsed() {
        sel.start
    } else {
        delete_range(doc, &sel)?
    };
    let caret = normalize_to_text(doc, caret, false);
    let Some(li) = enclosing_li(doc, caret.node) else {
        return Ok(Selection::caret(caret));
    };
    let Some(list) = doc
        .parent(li)
        .filter(|&l| doc.tag(l).map(Tag::is_list).unwrap_or(false))
    else {
        return Ok(Selection::caret(caret));
    };

    let block = block_within(doc, caret.node, li);
    let style = doc.tag(block).filter(|tag| tag.is_style());

    if !subtree_has_content(doc, li) {
        return if doc.next_sibling(li).is_none() {
            outdent_trailing_item(doc, li, list)
        } else {
            replace_with_placeholder(doc, li, style)
        };
    }

    let at_start = doc.first_text_descendant(block) == Some(caret.node) && caret.offset == 0;
    let at_end = last_text_descendant(doc, block) == Some(caret.node)
        && caret.offset == doc.len_of(caret.node);

    if at_start {
        let item = doc.create_element(Tag::Li);
        doc.insert_before(li, item);
        let placeholder = empty_block(doc, style.unwrap_or(Tag::P));
        doc.append(item, placeholder);
        return Ok(Selection::caret(caret));
    }
    if at_end {
        let item = doc.create_element(Tag::Li);
        doc.insert_after(li, item);
        let placeholder = empty_block(doc, style.unwrap_or(Tag::P));
        doc.append(item, placeholder);
        // Sublists and anything else after the caret's block stay with the
        // new item.
        let top = child_within(doc, caret.node, li).unwrap_or(block);
        let boundary = if block == li { top } else { block };
        let position = doc.index_of(boundary).unwrap_or(0);
        let trailing: Vec<NodeId> = doc
            .children(li)
            .get(position + 1..)
            .unwrap_or(&[])
            .to_vec();
        for child in trailing {
            doc.append(item, child);
        }
        return Ok(Selection::caret(Anchor::new(placeholder, 0)));
    }
    split_item(doc, caret, li, list, style)
}

/// A fresh block of `tag` holding only the placeholder `<br>`.
fn empty_block(doc: &mut Document, tag: Tag) -> NodeId {
    let block = doc.create_element(tag);
    let br = doc.create_element(Tag::Br);
    doc.append(block, br);
    block
}

/// The styled block holding `node` within `li`, or `li` itself for unstyled
/// content.
fn block_within(doc: &Document, node: NodeId, li: NodeId) -> NodeId {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == li {
            return li;
        }
        if doc.tag(n).map(Tag::is_style).unwrap_or(false) {
            return n;
        }
        current = doc.parent(n);
    }
    li
}

/// The direct child of `parent` on the path down to `node`.
fn child_within(doc: &Document, node: NodeId, parent: NodeId) -> Option<NodeId> {
    let mut current = node;
    while let Some(up) = doc.parent(current) {
        if up == parent {
            return Some(current);
        }
        current = up;
    }
    None
}

/// Enter in an empty trailing item moves its content out after the list.
fn outdent_trailing_item(
    doc: &mut Document,
    li: NodeId,
    list: NodeId,
) -> EditorResult<Selection> {
    let children: Vec<NodeId> = doc.children(li).to_vec();
    doc.detach(li);
    let anchor_block;
    if children.is_empty() {
        let block = empty_block(doc, Tag::P);
        doc.insert_after(list, block);
        anchor_block = block;
    } else {
        let mut after = list;
        for child in children {
            doc.insert_after(after, child);
            after = child;
        }
        anchor_block = after;
    }
    let has_items = doc
        .children(list)
        .iter()
        .any(|&c| doc.tag(c) == Some(Tag::Li));
    if !has_items {
        doc.detach(list);
    }
    Ok(Selection::caret(Anchor::new(anchor_block, 0)))
}

/// An item emptied by a range deletion becomes a fresh placeholder item.
fn replace_with_placeholder(
    doc: &mut Document,
    li: NodeId,
    style: Option<Tag>,
) -> EditorResult<Selection> {
    let item = doc.create_element(Tag::Li);
    doc.insert_before(li, item);
    doc.detach(li);
    let placeholder = empty_block(doc, style.unwrap_or(Tag::P));
    doc.append(item, placeholder);
    Ok(Selection::caret(Anchor::new(placeholder, 0)))
}

/// Split the item at the caret into two sibling items.
fn split_item(
    doc: &mut Document,
    caret: Anchor,
    li: NodeId,
    list: NodeId,
    style: Option<Tag>,
) -> EditorResult<Selection> {
    // The caret text always splits, even into empty halves, so enclosing
    // inline wrappers can be split to both sides.
    let right_text = split_text(doc, caret.node, caret.offset);
    convert_edge_spaces(doc, caret.node);
    convert_edge_spaces(doc, right_text);

    let mut parent = doc.parent(caret.node).ok_or(EditorError::NoSelection)?;
    let mut index = doc.index_of(right_text).ok_or(EditorError::NoSelection)?;
    while parent != list {
        let grandparent = doc.parent(parent).ok_or(EditorError::NoSelection)?;
        let position = doc.index_of(parent).ok_or(EditorError::NoSelection)?;
        let forced = doc.tag(parent).map(Tag::is_format).unwrap_or(false);
        if forced {
            split_element(doc, parent, index);
            index = position + 1;
        } else if index == 0 {
            index = position;
        } else if index == doc.len_of(parent) {
            index = position + 1;
        } else {
            split_element(doc, parent, index);
            index = position + 1;
        }
        parent = grandparent;
    }

    let right_li = doc
        .children(list)
        .get(index)
        .copied()
        .ok_or(EditorError::NoSelection)?;
    clean_after_split(doc, li);
    clean_after_split(doc, right_li);
    if style.is_none() {
        wrap_leading_inline(doc, right_li);
    }
    let caret = doc
        .first_text_descendant(right_li)
        .map(|text| Anchor::new(text, 0))
        .unwrap_or(Anchor::new(right_li, 0));
    Ok(Selection::caret(caret))
}

/// After a forced split: empty text inside an otherwise-empty inline wrapper
/// becomes the zero-width marker, other empty leftovers go away.
fn clean_after_split(doc: &mut Document, item: NodeId) {
    let order = doc.descendants(item);
    for &n in order.iter().rev() {
        if n == item {
            continue;
        }
        let parent_format = doc
            .parent(n)
            .and_then(|p| doc.tag(p))
            .map(Tag::is_format)
            .unwrap_or(false);
        if doc.text(n).map(str::is_empty).unwrap_or(false) {
            let only_child = doc
                .parent(n)
                .map(|p| doc.children(p).len() == 1)
                .unwrap_or(false);
            if parent_format && only_child {
                if let Some(text) = doc.text_mut(n) {
                    text.push(ZERO_WIDTH);
                }
            } else {
                doc.detach(n);
            }
        } else if doc.tag(n).map(Tag::is_format).unwrap_or(false) && doc.children(n).is_empty() {
            let marker = doc.create_text(ZERO_WIDTH.to_string());
            doc.append(n, marker);
        }
    }
}

/// Edge spaces of a freshly split text node would collapse when rendered;
/// harden them to non-breaking spaces.
fn convert_edge_spaces(doc: &mut Document, node: NodeId) {
    let Some(text) = doc.text_mut(node) else {
        return;
    };
    if text.starts_with(' ') {
        text.replace_range(0..1, "\u{A0}");
    }
    if text.ends_with(' ') {
        let start = text.len() - 1;
        text.replace_range(start.., NBSP.to_string().as_str());
    }
}

/// Unstyled right halves get their leading inline run wrapped in a fresh
/// paragraph.
fn wrap_leading_inline(doc: &mut Document, li: NodeId) -> Option<NodeId> {
    let children: Vec<NodeId> = doc.children(li).to_vec();
    let inline: Vec<NodeId> = children
        .into_iter()
        .take_while(|&c| is_inline(doc, c))
        .collect();
    if inline.is_empty() {
        return None;
    }
    let block = doc.create_element(Tag::P);
    doc.insert(li, 0, block);
    for child in inline {
        doc.append(block, child);
    }
    Some(block)
}

fn is_inline(doc: &Document, node: NodeId) -> bool {
    doc.is_text(node)
        || doc
            .tag(node)
            .map(|t| t.is_format() || matches!(t, Tag::A | Tag::Img | Tag::Br))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_parser::{parse, serialize};

    const START: &str = "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>";

    fn caret_at(doc: &Document, id: &str, child: Option<usize>, offset: usize) -> Selection {
        let el = doc.element_by_id(id).unwrap();
        let node = match child {
            Some(i) => doc.children(el)[i],
            None => doc.first_text_descendant(el).unwrap(),
        };
        Selection::caret(Anchor::new(node, offset))
    }

    #[test]
    fn test_enter_at_end_of_styled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "h5", Some(2), 3);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5></li><li><h5><br></h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_at_start_of_styled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "h5", None, 0);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li><h5><br></h5></li><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_in_middle_of_styled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "h5", None, 3);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bul</h5></li><li><h5>leted&nbsp;<i id=\"i\">item</i> 1.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_before_final_period() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "h5", Some(2), 2);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i>&nbsp;1</h5></li><li><h5>.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_inside_formatted_text() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "i", None, 2);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">it</i></h5></li><li><h5><i>em</i> 1.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_at_end_of_unstyled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "ol1", None, 16);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5><ol><li id=\"ol1\">Numbered item 1.</li><li><p><br></p></li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_at_start_of_unstyled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "ol1", None, 0);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5><ol><li><p><br></p></li><li id=\"ol1\">Numbered item 1.</li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_split_unstyled_item() {
        let mut doc = parse(START).unwrap();
        let sel = caret_at(&doc, "ol1", None, 6);
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5><ol><li id=\"ol1\">Number</li><li><p>ed item 1.</p></li><li id=\"ol2\">Numbered item 2.</li></ol></li><li id=\"ul2\"><h5>Bulleted item 2.</h5></li></ul>"
        );
    }

    #[test]
    fn test_enter_in_empty_trailing_item_outdents() {
        let start = "<ul><li id=\"ul1\"><h5 id=\"h51\">Bulleted item 1.</h5></li><li id=\"ul2\"><h5 id=\"h52\"><br></h5></li></ul>";
        let mut doc = parse(start).unwrap();
        let h52 = doc.element_by_id("h52").unwrap();
        let sel = Selection::caret(Anchor::new(h52, 0));
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h51\">Bulleted item 1.</h5></li></ul><h5 id=\"h52\"><br></h5>"
        );
    }

    #[test]
    fn test_range_enter_splits_formatted_run_with_markers() {
        let start = "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">item</i> 1.</h5></li></ul>";
        let mut doc = parse(start).unwrap();
        let i = doc.element_by_id("i").unwrap();
        let text = doc.first_text_descendant(i).unwrap();
        let sel = Selection::new(Anchor::new(text, 0), Anchor::new(text, 4));
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"ul1\"><h5 id=\"h5\">Bulleted <i id=\"i\">\u{200B}</i></h5></li><li><h5><i>\u{200B}</i> 1.</h5></li></ul>"
        );
    }

    #[test]
    fn test_range_enter_across_items_joins_tail() {
        let start = "<ul><li id=\"a\"><p id=\"pa\">P one</p></li><li id=\"b\"><p id=\"pb\">P two</p></li></ul>";
        let mut doc = parse(start).unwrap();
        let pa = doc.element_by_id("pa").unwrap();
        let pb = doc.element_by_id("pb").unwrap();
        let sel = Selection::new(
            Anchor::new(doc.first_text_descendant(pa).unwrap(), 2),
            Anchor::new(doc.first_text_descendant(pb).unwrap(), 2),
        );
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li id=\"a\"><p id=\"pa\">P&nbsp;</p></li><li><p>two</p></li></ul>"
        );
    }

    #[test]
    fn test_range_enter_emptying_an_item_leaves_placeholder() {
        let start = "<ul><li id=\"a\">one</li><li id=\"b\">two</li><li id=\"c\">three</li></ul>";
        let mut doc = parse(start).unwrap();
        let a = doc.element_by_id("a").unwrap();
        let c = doc.element_by_id("c").unwrap();
        let sel = Selection::new(
            Anchor::new(doc.first_text_descendant(a).unwrap(), 0),
            Anchor::new(doc.first_text_descendant(c).unwrap(), 0),
        );
        list_enter(&mut doc, &sel).unwrap();
        assert_eq!(
            serialize(&doc),
            "<ul><li><p><br></p></li><li id=\"c\">three</li></ul>"
        );
    }
}

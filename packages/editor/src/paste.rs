//! Paste normalization and insertion.
//!
//! Incoming HTML/plain text is cleaned into the constrained grammar first,
//! then inserted at the selection: inline content splices into the host text
//! run in place, block content splits the host block and lands between the
//! halves.

use markup_parser::{parse, Document, NodeId, Tag};

use crate::errors::{EditorError, EditorResult};
use crate::mutations::{
    delete_range, last_text_descendant, merge_adjacent_text, nearest_block, prune_empty,
    split_element, split_text, subtree_has_content, unwrap_element,
};
use crate::selection::{Anchor, Selection};

/// Clean arbitrary pasted HTML into the grammar: disallowed elements and
/// attributes are already stripped by the lenient parse; empty wrappers are
/// pruned and top-level inline runs are re-rooted into paragraphs.
pub fn preprocess_html_for_paste(raw: &str) -> EditorResult<String> {
    let mut fragment = parse_fragment(raw)?;
    let root = fragment.root();
    prune_empty(&mut fragment, root);
    group_inline_into_paragraphs(&mut fragment);
    Ok(markup_parser::serialize(&fragment))
}

/// Clean pasted content down to unformatted text: all inline formatting and
/// links are stripped, every styled block becomes a paragraph, and plain-text
/// input maps newlines to `<br>` with leading indentation hardened to
/// non-breaking spaces.
pub fn preprocess_text_for_paste(raw: &str) -> EditorResult<String> {
    let mut fragment = text_fragment(raw)?;
    if raw.contains('<') {
        group_inline_into_paragraphs(&mut fragment);
    }
    Ok(markup_parser::serialize(&fragment))
}

/// Paste HTML at the selection.
pub fn paste_html(doc: &mut Document, sel: &Selection, raw: &str) -> EditorResult<Selection> {
    let mut fragment = parse_fragment(raw)?;
    let root = fragment.root();
    prune_empty(&mut fragment, root);
    insert_fragment(doc, sel, fragment)
}

/// Paste content as unformatted text at the selection.
pub fn paste_text(doc: &mut Document, sel: &Selection, raw: &str) -> EditorResult<Selection> {
    let fragment = text_fragment(raw)?;
    insert_fragment(doc, sel, fragment)
}

/// Insert an `<img>` for a registered resource at the selection.
pub fn paste_image(
    doc: &mut Document,
    sel: &Selection,
    src: &str,
    alt: Option<&str>,
) -> EditorResult<Selection> {
    let mut fragment = Document::new();
    let mut attrs = markup_parser::Attributes::new();
    attrs.src = Some(src.to_string());
    attrs.alt = alt.map(str::to_string);
    let img = fragment.create_element_with(Tag::Img, attrs);
    let root = fragment.root();
    fragment.append(root, img);
    insert_fragment(doc, sel, fragment)
}

fn parse_fragment(raw: &str) -> EditorResult<Document> {
    parse(raw).map_err(|e| EditorError::MalformedPasteInput(e.to_string()))
}

/// Build the cleaned fragment for a text paste.
fn text_fragment(raw: &str) -> EditorResult<Document> {
    if !raw.contains('<') {
        return Ok(plain_text_fragment(raw));
    }
    let mut fragment = parse_fragment(raw)?;
    strip_formatting(&mut fragment);
    let root = fragment.root();
    prune_empty(&mut fragment, root);
    // Top-level inline runs stay bare here; insertion splices them in place
    // and only block-bearing fragments get grouped into paragraphs.
    Ok(fragment)
}

/// Plain text becomes text runs separated by `<br>`, with post-newline
/// leading spaces kept as `&nbsp;` so indentation survives rendering.
fn plain_text_fragment(raw: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    for (index, line) in raw.split('\n').enumerate() {
        if index > 0 {
            let br = doc.create_element(Tag::Br);
            doc.append(root, br);
        }
        let content = if index == 0 {
            line.to_string()
        } else {
            let trimmed = line.trim_start_matches(' ');
            let pad = line.len() - trimmed.len();
            let mut out = "\u{A0}".repeat(pad);
            out.push_str(trimmed);
            out
        };
        if !content.is_empty() {
            let text = doc.create_text(content);
            doc.append(root, text);
        }
    }
    doc
}

/// Unwrap every inline formatting wrapper and link, drop images, and flatten
/// every styled block to a fresh id-less paragraph.
fn strip_formatting(doc: &mut Document) {
    let order = doc.descendants(doc.root());
    for &node in order.iter().rev() {
        let Some(tag) = doc.tag(node) else {
            continue;
        };
        if tag == Tag::Img {
            doc.detach(node);
        } else if tag.is_format() || tag == Tag::A {
            unwrap_element(doc, node);
        }
    }
    let order = doc.descendants(doc.root());
    for node in order {
        if !doc.is_attached(node) {
            continue;
        }
        if doc.tag(node).map(Tag::is_style).unwrap_or(false) {
            let fresh = doc.create_element(Tag::P);
            doc.insert_before(node, fresh);
            let children: Vec<NodeId> = doc.children(node).to_vec();
            for child in children {
                doc.append(fresh, child);
            }
            doc.detach(node);
        }
    }
}

/// Wrap each run of consecutive top-level inline nodes in a paragraph, so no
/// bare inline content sits under the root.
pub(crate) fn group_inline_into_paragraphs(doc: &mut Document) {
    let children: Vec<NodeId> = doc.children(doc.root()).to_vec();
    let mut run: Vec<NodeId> = Vec::new();
    let mut runs: Vec<Vec<NodeId>> = Vec::new();
    for child in children {
        if is_inline(doc, child) {
            run.push(child);
        } else if !run.is_empty() {
            runs.push(std::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    for run in runs {
        let block = doc.create_element(Tag::P);
        doc.insert_before(run[0], block);
        for node in run {
            doc.append(block, node);
        }
    }
}

fn is_inline(doc: &Document, node: NodeId) -> bool {
    doc.is_text(node)
        || doc
            .tag(node)
            .map(|t| t.is_format() || matches!(t, Tag::A | Tag::Img | Tag::Br))
            .unwrap_or(false)
}

/// Copy a subtree from one arena into another. Returns the new root of the
/// copy, detached.
fn import_node(target: &mut Document, source: &Document, node: NodeId) -> NodeId {
    if let Some(text) = source.text(node) {
        return target.create_text(text.to_string());
    }
    let tag = source.tag(node).unwrap_or(Tag::P);
    let attrs = source.attrs(node).cloned().unwrap_or_default();
    let element = target.create_element_with(tag, attrs);
    for &child in source.children(node) {
        let copy = import_node(target, source, child);
        target.append(element, copy);
    }
    element
}

/// Insert a cleaned fragment at the selection. A non-collapsed destination is
/// deleted first.
fn insert_fragment(
    doc: &mut Document,
    sel: &Selection,
    mut fragment: Document,
) -> EditorResult<Selection> {
    let sel = sel.ordered(doc);
    sel.validate(doc)?;
    let collapsed = sel.is_collapsed();
    let mut caret = delete_range(doc, &sel)?;
    if !collapsed {
        // A range delete leaves emptied text nodes and wrappers in place for
        // the caret's sake; pasted content replaces them, so clear them out
        // and reanchor on the enclosing block if the caret went with them.
        let block = nearest_block(doc, caret.node);
        let mut top = caret.node;
        while top != block {
            match doc.parent(top) {
                Some(parent) if parent != block => top = parent,
                _ => break,
            }
        }
        let position = doc.index_of(top).unwrap_or(0);
        prune_empty(doc, block);
        if !doc.is_attached(caret.node) {
            caret = Anchor::new(block, position.min(doc.len_of(block)));
        }
    }
    if fragment.children(fragment.root()).is_empty() {
        return Ok(Selection::caret(caret));
    }
    let all_inline = fragment
        .children(fragment.root())
        .iter()
        .all(|&n| is_inline(&fragment, n));
    if all_inline {
        splice_inline(doc, caret, &fragment)
    } else {
        group_inline_into_paragraphs(&mut fragment);
        insert_blocks(doc, caret, &fragment)
    }
}

/// Splice inline content into the host text run, inside whatever wrappers
/// surround the caret.
fn splice_inline(doc: &mut Document, caret: Anchor, fragment: &Document) -> EditorResult<Selection> {
    let imported: Vec<NodeId> = fragment
        .children(fragment.root())
        .to_vec()
        .into_iter()
        .map(|n| import_node(doc, fragment, n))
        .collect();

    let (parent, mut at) = if doc.is_text(caret.node) {
        let parent = doc.parent(caret.node).ok_or(EditorError::NoSelection)?;
        let position = doc.index_of(caret.node).ok_or(EditorError::NoSelection)?;
        let len = doc.len_of(caret.node);
        if caret.offset == 0 {
            (parent, position)
        } else if caret.offset >= len {
            (parent, position + 1)
        } else {
            split_text(doc, caret.node, caret.offset);
            (parent, position + 1)
        }
    } else {
        // An empty block loses its placeholder once real content arrives.
        if doc.is_empty_block(caret.node) {
            if let Some(&br) = doc.children(caret.node).first() {
                doc.detach(br);
            }
            (caret.node, 0)
        } else {
            (caret.node, caret.offset.min(doc.len_of(caret.node)))
        }
    };
    for node in imported {
        doc.insert(parent, at, node);
        at += 1;
    }
    merge_adjacent_text(doc, parent);
    let caret = last_text_descendant(doc, parent)
        .map(|text| Anchor::new(text, doc.len_of(text)))
        .unwrap_or(Anchor::new(parent, doc.len_of(parent)));
    Ok(Selection::caret(caret))
}

/// Insert block content by splitting the host block at the caret.
///
/// The first pasted block merges into the left half only when the caret sits
/// directly in the host block's own text; inside inline formatting the pasted
/// blocks stay whole. A host left empty on either side of the split becomes a
/// placeholder paragraph (right) or goes away (left). An empty host block is
/// replaced outright.
fn insert_blocks(doc: &mut Document, caret: Anchor, fragment: &Document) -> EditorResult<Selection> {
    let mut imported: Vec<NodeId> = fragment
        .children(fragment.root())
        .to_vec()
        .into_iter()
        .map(|n| import_node(doc, fragment, n))
        .collect();

    let host = nearest_block(doc, caret.node);
    if !subtree_has_content(doc, host) {
        for &node in &imported {
            doc.insert_before(host, node);
        }
        doc.detach(host);
        let last = imported[imported.len() - 1];
        let caret = last_text_descendant(doc, last)
            .map(|text| Anchor::new(text, doc.len_of(text)))
            .unwrap_or(Anchor::new(last, 0));
        return Ok(Selection::caret(caret));
    }

    let parent = doc.parent(host).ok_or(EditorError::NoSelection)?;
    let direct = doc.parent(caret.node) == Some(host) || caret.node == host;
    let right = force_split_block(doc, caret, host)?;

    if direct {
        let first = imported.remove(0);
        let children: Vec<NodeId> = doc.children(first).to_vec();
        for child in children {
            doc.append(host, child);
        }
        doc.detach(first);
        merge_adjacent_text(doc, host);
    }
    let mut at = doc.index_of(right).ok_or(EditorError::NoSelection)?;
    for &node in &imported {
        doc.insert(parent, at, node);
        at += 1;
    }

    prune_empty(doc, host);
    if !subtree_has_content(doc, host) {
        doc.detach(host);
    }
    prune_empty(doc, right);
    if !subtree_has_content(doc, right) {
        let placeholder = doc.create_element(Tag::P);
        let br = doc.create_element(Tag::Br);
        doc.append(placeholder, br);
        doc.insert_before(right, placeholder);
        doc.detach(right);
        return Ok(Selection::caret(Anchor::new(placeholder, 0)));
    }
    let caret = doc
        .first_text_descendant(right)
        .map(|text| Anchor::new(text, 0))
        .unwrap_or(Anchor::new(right, 0));
    Ok(Selection::caret(caret))
}

/// Split the host block at the caret into two halves, unconditionally, so
/// both sides exist even when one is empty.
fn force_split_block(doc: &mut Document, caret: Anchor, host: NodeId) -> EditorResult<NodeId> {
    let mut parent;
    let mut index;
    if doc.is_text(caret.node) {
        let right = split_text(doc, caret.node, caret.offset);
        parent = doc.parent(caret.node).ok_or(EditorError::NoSelection)?;
        index = doc.index_of(right).ok_or(EditorError::NoSelection)?;
    } else {
        parent = caret.node;
        index = caret.offset.min(doc.len_of(caret.node));
    }
    loop {
        let right = split_element(doc, parent, index);
        if parent == host {
            return Ok(right);
        }
        index = doc.index_of(parent).ok_or(EditorError::NoSelection)? + 1;
        parent = doc.parent(parent).ok_or(EditorError::NoSelection)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_caret(doc: &Document, id: &str, offset: usize) -> Selection {
        let el = doc.element_by_id(id).unwrap();
        let text = doc.first_text_descendant(el).unwrap();
        Selection::caret(Anchor::new(text, offset))
    }

    #[test]
    fn test_preprocess_keeps_clean_html() {
        let html = "<h5 id=\"h5\">This is just a simple paragraph.</h5>";
        assert_eq!(preprocess_html_for_paste(html).unwrap(), html);
    }

    #[test]
    fn test_preprocess_reroots_interchange_newline() {
        let html = "<h1 id=\"h1\" style=\"font-size: 2.5em;\">Welcome</h1><br class=\"Apple-interchange-newline\">";
        assert_eq!(
            preprocess_html_for_paste(html).unwrap(),
            "<h1 id=\"h1\">Welcome</h1><p><br></p>"
        );
    }

    #[test]
    fn test_preprocess_text_flattens_styles_and_formats() {
        let html = "<h5 id=\"h5\">This is <b>just</b> a <a href=\"x\">link</a>.</h5>";
        assert_eq!(
            preprocess_text_for_paste(html).unwrap(),
            "<p>This is just a link.</p>"
        );
    }

    #[test]
    fn test_preprocess_plain_text_converts_newlines_and_indentation() {
        let raw = "line one {\n    x && y;\n};";
        assert_eq!(
            preprocess_text_for_paste(raw).unwrap(),
            "line one {<br>&nbsp;&nbsp;&nbsp;&nbsp;x &amp;&amp; y;<br>};"
        );
    }

    #[test]
    fn test_paste_inline_text_into_word() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "p", 10);
        paste_text(&mut doc, &sel, "Hello world").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is juHello worldst a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_text_with_markup_splices_inline() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "p", 10);
        paste_text(&mut doc, &sel, "Hello <b>bold</b> world").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is juHello bold worldst a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_inline_html_inside_bold() {
        let mut doc = parse("<p id=\"p\">This is <b id=\"b\">just</b> a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "b", 2);
        paste_html(&mut doc, &sel, "Hello <i>bold</i> world").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is <b id=\"b\">juHello <i>bold</i> worldst</b> a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_paragraph_mid_text_merges_into_left() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "p", 10);
        paste_html(&mut doc, &sel, "<p>Hello world</p>").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is juHello world</p><p>st a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_paragraph_inside_bold_keeps_blocks_whole() {
        let mut doc = parse("<p id=\"p\">This is <b id=\"b\">just</b> a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "b", 2);
        paste_html(&mut doc, &sel, "<p>Hello <i>bold</i> world</p>").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is <b id=\"b\">ju</b></p><p>Hello <i>bold</i> world</p><p><b>st</b> a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_paragraph_at_start_moves_id_with_content() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "p", 0);
        paste_html(&mut doc, &sel, "<p>Hello world</p>").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">Hello world</p><p>This is just a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_paragraph_at_end_leaves_placeholder() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let sel = text_caret(&doc, "p", 32);
        paste_html(&mut doc, &sel, "<p>Hello world</p>").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is just a simple paragraph.Hello world</p><p><br></p>"
        );
    }

    #[test]
    fn test_paste_into_blank_paragraph_replaces_it() {
        let mut doc =
            parse("<p id=\"p\">This is just a simple paragraph.</p><p id=\"blank\"><br></p>").unwrap();
        let blank = doc.element_by_id("blank").unwrap();
        let sel = Selection::caret(Anchor::new(blank, 0));
        paste_html(&mut doc, &sel, "<h5>Hello <b>bold</b> world</h5>").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is just a simple paragraph.</p><h5>Hello <b>bold</b> world</h5>"
        );
    }

    #[test]
    fn test_paste_deletes_range_first() {
        let mut doc = parse("<p id=\"p\">This is just a simple paragraph.</p>").unwrap();
        let p = doc.element_by_id("p").unwrap();
        let text = doc.first_text_descendant(p).unwrap();
        let sel = Selection::new(Anchor::new(text, 8), Anchor::new(text, 12));
        paste_text(&mut doc, &sel, "not").unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">This is not a simple paragraph.</p>"
        );
    }

    #[test]
    fn test_paste_image_splices_at_caret() {
        let mut doc = parse("<p id=\"p\">Hello world</p>").unwrap();
        let sel = text_caret(&doc, "p", 5);
        paste_image(&mut doc, &sel, "0a1b2c3d.png", None).unwrap();
        assert_eq!(
            markup_parser::serialize(&doc),
            "<p id=\"p\">Hello<img src=\"0a1b2c3d.png\"> world</p>"
        );
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = paste_html(
            &mut parse("<p id=\"p\">x</p>").unwrap(),
            &Selection::caret(Anchor::new(markup_parser::parse("<p id=\"p\">x</p>").unwrap().root(), 0)),
            "<p <<",
        )
        .unwrap_err();
        assert!(matches!(err, EditorError::MalformedPasteInput(_)));
    }
}

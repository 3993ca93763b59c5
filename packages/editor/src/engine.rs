//! The editing engine a host view drives.
//!
//! The engine owns the document, the selection, an outgoing event queue and
//! the image resource registry. Every command runs against a scratch copy of
//! the document and commits only on success, so a failed edit never leaves a
//! half-applied tree behind.

use std::collections::{HashMap, HashSet};

use markup_parser::{parse, serialize, Document, Tag};
use tracing::{debug, warn};

use crate::errors::{EditorError, EditorResult};
use crate::format::{format_state, toggle_format, FormatState};
use crate::list::list_enter;
use crate::paste::{group_inline_into_paragraphs, paste_html, paste_image, paste_text};
use crate::protocol::{Command, Event, FormatKind, ListKind, SelectionState, Severity};
use crate::selection::{resolve_address, Selection};
use crate::style::{
    enclosing_li, indent, nearest_style_block, outdent, quote_level, replace_style,
    toggle_list_item,
};

pub struct Engine {
    document: Document,
    selection: Option<Selection>,
    events: Vec<Event>,
    resources: HashMap<String, Vec<u8>>,
    focused: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        let mut document = Document::new();
        ensure_placeholders(&mut document);
        Engine {
            document,
            selection: None,
            events: Vec::new(),
            resources: HashMap::new(),
            focused: false,
        }
    }

    /// Replace the document with parsed, normalized content.
    pub fn load_html(&mut self, html: &str) -> EditorResult<()> {
        let mut document = parse(html)?;
        group_inline_into_paragraphs(&mut document);
        ensure_placeholders(&mut document);
        self.document = document;
        self.selection = None;
        self.events.push(Event::Loaded);
        Ok(())
    }

    /// Canonical serialization of the current document.
    pub fn get_html(&self) -> String {
        serialize(&self.document)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Drain the pending event queue.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn focus(&mut self) {
        if !self.focused {
            self.focused = true;
            self.events.push(Event::FocusGained);
        }
    }

    pub fn blur(&mut self) {
        if self.focused {
            self.focused = false;
            self.events.push(Event::FocusLost);
        }
    }

    /// Register image bytes and return the content-addressed resource name.
    pub fn add_resource(&mut self, bytes: Vec<u8>) -> String {
        let name = format!("{:08x}.png", crc32fast::hash(&bytes));
        self.resources.insert(name.clone(), bytes);
        name
    }

    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.resources.get(name).map(Vec::as_slice)
    }

    /// Point the selection at element ids, as a host addresses the document.
    /// Returns false (and leaves the selection alone) when an address does
    /// not resolve.
    pub fn set_selection(
        &mut self,
        start_id: &str,
        start_offset: usize,
        end_id: &str,
        end_offset: usize,
        start_child: Option<usize>,
        end_child: Option<usize>,
    ) -> bool {
        let start = resolve_address(&self.document, start_id, start_offset, start_child);
        let end = resolve_address(&self.document, end_id, end_offset, end_child);
        match (start, end) {
            (Some(start), Some(end)) => {
                self.selection = Some(Selection::new(start, end).ordered(&self.document));
                self.events.push(Event::SelectionChanged);
                true
            }
            _ => false,
        }
    }

    /// Run one command. A failure is reported as an error event and the
    /// document is left untouched.
    pub fn execute(&mut self, command: Command) {
        debug!(command = command.name(), "dispatch");
        let context = command.name();
        if let Err(error) = self.try_execute(command) {
            warn!(code = error.code(), command = context, %error, "command failed");
            self.events.push(Event::Error {
                code: error.code().to_string(),
                message: error.to_string(),
                context: context.to_string(),
                severity: if error.alerts_user() {
                    Severity::Alert
                } else {
                    Severity::Log
                },
            });
        }
    }

    fn try_execute(&mut self, command: Command) -> EditorResult<()> {
        let sel = self.selection.clone().ok_or(EditorError::NoSelection)?;
        let mut scratch = self.document.clone();
        let before = image_sources(&scratch);
        let sel = match command {
            Command::ToggleFormat { kind } => toggle_format(&mut scratch, &sel, kind.tag())?,
            Command::ReplaceStyle { style } => replace_style(&mut scratch, &sel, style)?,
            Command::ToggleListItem { kind } => toggle_list_item(&mut scratch, &sel, kind.tag())?,
            Command::Indent => indent(&mut scratch, &sel)?,
            Command::Outdent => outdent(&mut scratch, &sel)?,
            Command::ListEnter => list_enter(&mut scratch, &sel)?,
            Command::PasteHtml { html } => paste_html(&mut scratch, &sel, &html)?,
            Command::PasteText { text } => paste_text(&mut scratch, &sel, &text)?,
            Command::PasteImage { name, alt } => {
                if !self.resources.contains_key(&name) {
                    return Err(EditorError::MalformedPasteInput(format!(
                        "no image resource named {name}"
                    )));
                }
                paste_image(&mut scratch, &sel, &name, alt.as_deref())?
            }
        };
        let after = image_sources(&scratch);
        self.document = scratch;
        self.selection = Some(sel);
        self.events.push(Event::ContentChanged);
        self.events.push(Event::SelectionChanged);
        for src in after.difference(&before) {
            self.events.push(Event::ImageInserted { src: src.clone() });
        }
        for src in before.difference(&after) {
            self.events.push(Event::ImageRemoved { src: src.clone() });
        }
        Ok(())
    }

    /// Snapshot of the selection for toolbar state.
    pub fn selection_state(&self) -> SelectionState {
        let Some(sel) = &self.selection else {
            return SelectionState::default();
        };
        if sel.validate(&self.document).is_err() {
            return SelectionState::default();
        }
        let doc = &self.document;
        let applied =
            |kind: FormatKind| format_state(doc, sel, kind.tag()) == FormatState::Applied;
        let node = sel.start.node;
        let style = nearest_style_block(doc, node).and_then(|n| doc.tag(n));
        let list = enclosing_li(doc, node)
            .and_then(|li| doc.parent(li))
            .and_then(|l| doc.tag(l))
            .and_then(ListKind::from_tag);
        let link = ancestor_with_tag(doc, node, Tag::A);
        let image = if doc.tag(node) == Some(Tag::Img) {
            Some(node)
        } else {
            doc.children(node)
                .get(sel.start.offset)
                .copied()
                .filter(|&n| doc.tag(n) == Some(Tag::Img))
        };
        SelectionState {
            valid: true,
            bold: applied(FormatKind::Bold),
            italic: applied(FormatKind::Italic),
            underline: applied(FormatKind::Underline),
            strike: applied(FormatKind::Strike),
            subscript: applied(FormatKind::Subscript),
            superscript: applied(FormatKind::Superscript),
            code: applied(FormatKind::Code),
            style,
            list,
            quote_level: quote_level(doc, node),
            in_link: link.is_some(),
            href: link
                .and_then(|n| doc.attrs(n))
                .and_then(|a| a.href.clone()),
            in_image: image.is_some(),
            src: image
                .and_then(|n| doc.attrs(n))
                .and_then(|a| a.src.clone()),
            in_table: ancestor_with_tag(doc, node, Tag::Table).is_some(),
        }
    }
}

fn ancestor_with_tag(doc: &Document, node: markup_parser::NodeId, tag: Tag) -> Option<markup_parser::NodeId> {
    if doc.tag(node) == Some(tag) {
        return Some(node);
    }
    doc.ancestors(node)
        .into_iter()
        .find(|&n| doc.tag(n) == Some(tag))
}

fn image_sources(doc: &Document) -> HashSet<String> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.tag(n) == Some(Tag::Img))
        .filter_map(|n| doc.attrs(n).and_then(|a| a.src.clone()))
        .collect()
}

/// An editable document always offers somewhere to type: an empty tree gets
/// one empty paragraph, and every childless style block or list item gets a
/// `<br>` placeholder.
fn ensure_placeholders(doc: &mut Document) {
    let root = doc.root();
    if doc.children(root).is_empty() {
        let p = doc.create_element(Tag::P);
        doc.append(root, p);
    }
    let order = doc.descendants(root);
    for node in order {
        let editable = doc
            .tag(node)
            .map(|t| t.is_style() || matches!(t, Tag::Li | Tag::Td | Tag::Blockquote))
            .unwrap_or(false);
        if editable && doc.children(node).is_empty() {
            let br = doc.create_element(Tag::Br);
            doc.append(node, br);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_engine_offers_empty_paragraph() {
        let engine = Engine::new();
        assert_eq!(engine.get_html(), "<p><br></p>");
    }

    #[test]
    fn test_load_normalizes_bare_text() {
        let mut engine = Engine::new();
        engine.load_html("Hello <b>bold</b> world").unwrap();
        assert_eq!(engine.get_html(), "<p>Hello <b>bold</b> world</p>");
        assert_eq!(engine.take_events(), vec![Event::Loaded]);
    }

    #[test]
    fn test_command_without_selection_reports_error() {
        let mut engine = Engine::new();
        engine.load_html("<p id=\"p\">Hello</p>").unwrap();
        engine.take_events();
        engine.execute(Command::ToggleFormat {
            kind: FormatKind::Bold,
        });
        let events = engine.take_events();
        assert!(matches!(
            &events[0],
            Event::Error { code, severity: Severity::Log, .. } if code == "no-selection"
        ));
        assert_eq!(engine.get_html(), "<p id=\"p\">Hello</p>");
    }

    #[test]
    fn test_execute_commits_and_reports_change() {
        let mut engine = Engine::new();
        engine.load_html("<p id=\"p\">Hello world</p>").unwrap();
        assert!(engine.set_selection("p", 0, "p", 5, None, None));
        engine.take_events();
        engine.execute(Command::ToggleFormat {
            kind: FormatKind::Bold,
        });
        assert_eq!(engine.get_html(), "<p id=\"p\"><b>Hello</b> world</p>");
        assert_eq!(
            engine.take_events(),
            vec![Event::ContentChanged, Event::SelectionChanged]
        );
        assert!(engine.selection_state().bold);
    }

    #[test]
    fn test_failed_command_leaves_document_untouched() {
        let mut engine = Engine::new();
        engine.load_html("<p id=\"p\">Hello</p>").unwrap();
        assert!(engine.set_selection("p", 0, "p", 0, None, None));
        engine.take_events();
        engine.execute(Command::PasteHtml {
            html: "<p <<".into(),
        });
        let events = engine.take_events();
        assert!(matches!(
            &events[0],
            Event::Error { severity: Severity::Alert, .. }
        ));
        assert_eq!(engine.get_html(), "<p id=\"p\">Hello</p>");
    }

    #[test]
    fn test_paste_image_roundtrip() {
        let mut engine = Engine::new();
        engine.load_html("<p id=\"p\">Hello world</p>").unwrap();
        let name = engine.add_resource(vec![1, 2, 3, 4]);
        assert!(engine.set_selection("p", 5, "p", 5, None, None));
        engine.take_events();
        engine.execute(Command::PasteImage {
            name: name.clone(),
            alt: None,
        });
        assert!(engine.get_html().contains(&format!("<img src=\"{name}\">")));
        let events = engine.take_events();
        assert!(events.contains(&Event::ImageInserted { src: name.clone() }));
        assert!(engine.resource(&name).is_some());
    }

    #[test]
    fn test_selection_state_reports_context() {
        let mut engine = Engine::new();
        engine
            .load_html(
                "<blockquote><ul><li><h5 id=\"h\">Hello <b id=\"b\">bold</b></h5></li></ul></blockquote>",
            )
            .unwrap();
        assert!(engine.set_selection("b", 1, "b", 1, None, None));
        let state = engine.selection_state();
        assert!(state.valid);
        assert!(state.bold);
        assert!(!state.italic);
        assert_eq!(state.style, Some(Tag::H5));
        assert_eq!(state.list, Some(ListKind::Unordered));
        assert_eq!(state.quote_level, 1);
    }

    #[test]
    fn test_focus_events_do_not_repeat() {
        let mut engine = Engine::new();
        engine.focus();
        engine.focus();
        engine.blur();
        assert_eq!(
            engine.take_events(),
            vec![Event::FocusGained, Event::FocusLost]
        );
    }
}

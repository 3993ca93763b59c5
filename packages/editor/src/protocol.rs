//! The message surface between a host view and the engine.
//!
//! Commands come in, events go out. Both sides are serde-tagged so a host can
//! drive the engine over any JSON channel without sharing Rust types.

use markup_parser::Tag;
use serde::{Deserialize, Serialize};

/// One inline formatting toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Subscript,
    Superscript,
    Code,
}

impl FormatKind {
    pub fn tag(self) -> Tag {
        match self {
            FormatKind::Bold => Tag::B,
            FormatKind::Italic => Tag::I,
            FormatKind::Underline => Tag::U,
            FormatKind::Strike => Tag::Del,
            FormatKind::Subscript => Tag::Sub,
            FormatKind::Superscript => Tag::Sup,
            FormatKind::Code => Tag::Code,
        }
    }

    pub const ALL: [FormatKind; 7] = [
        FormatKind::Bold,
        FormatKind::Italic,
        FormatKind::Underline,
        FormatKind::Strike,
        FormatKind::Subscript,
        FormatKind::Superscript,
        FormatKind::Code,
    ];
}

/// The two list flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn tag(self) -> Tag {
        match self {
            ListKind::Ordered => Tag::Ol,
            ListKind::Unordered => Tag::Ul,
        }
    }

    pub fn from_tag(tag: Tag) -> Option<ListKind> {
        match tag {
            Tag::Ol => Some(ListKind::Ordered),
            Tag::Ul => Some(ListKind::Unordered),
            _ => None,
        }
    }
}

/// Everything a host can ask the engine to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    ToggleFormat { kind: FormatKind },
    ReplaceStyle { style: Tag },
    ToggleListItem { kind: ListKind },
    Indent,
    Outdent,
    ListEnter,
    PasteHtml { html: String },
    PasteText { text: String },
    PasteImage { name: String, alt: Option<String> },
}

impl Command {
    /// Wire name of the command, used as error-event context.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleFormat { .. } => "toggleFormat",
            Command::ReplaceStyle { .. } => "replaceStyle",
            Command::ToggleListItem { .. } => "toggleListItem",
            Command::Indent => "indent",
            Command::Outdent => "outdent",
            Command::ListEnter => "listEnter",
            Command::PasteHtml { .. } => "pasteHtml",
            Command::PasteText { .. } => "pasteText",
            Command::PasteImage { .. } => "pasteImage",
        }
    }
}

/// Whether an error event should interrupt the user or just be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Alert,
    Log,
}

/// Notifications the engine emits back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    Loaded,
    ContentChanged,
    SelectionChanged,
    FocusGained,
    FocusLost,
    ImageInserted {
        src: String,
    },
    ImageRemoved {
        src: String,
    },
    Error {
        code: String,
        message: String,
        context: String,
        severity: Severity,
    },
}

/// Snapshot of the selection the host needs to render its toolbar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// Whether any selection exists at all.
    pub valid: bool,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub code: bool,
    /// Style block tag at the selection start, if any.
    pub style: Option<Tag>,
    pub list: Option<ListKind>,
    /// Blockquote nesting depth at the selection start.
    pub quote_level: usize,
    pub in_link: bool,
    pub href: Option<String>,
    pub in_image: bool,
    pub src: Option<String>,
    pub in_table: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd: Command = serde_json::from_str(
            r#"{"command":"toggleFormat","kind":"bold"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::ToggleFormat {
                kind: FormatKind::Bold
            }
        );

        let cmd: Command = serde_json::from_str(
            r#"{"command":"replaceStyle","style":"h2"}"#,
        )
        .unwrap();
        assert_eq!(cmd, Command::ReplaceStyle { style: Tag::H2 });
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_string(&Event::ImageInserted {
            src: "0a1b2c3d.png".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"imageInserted","src":"0a1b2c3d.png"}"#);
    }

    #[test]
    fn test_selection_state_defaults_invalid() {
        let state = SelectionState::default();
        assert!(!state.valid);
        assert_eq!(state.quote_level, 0);
        assert!(state.style.is_none());
    }
}

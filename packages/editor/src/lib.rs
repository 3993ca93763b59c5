//! Headless rich-text editing engine over the constrained HTML document
//! model in `markup-parser`.
//!
//! The crate is layered: `mutations` holds the primitive tree surgery
//! (splits, merges, range deletion), `format`/`style`/`list`/`paste`
//! implement the user-facing operations on top of it, and `engine` ties them
//! to the command/event protocol a host view speaks. All operations take the
//! document and a selection and return the selection that should follow the
//! edit, so the engine can keep the caret in a sensible place without the
//! operations knowing about hosts at all.

pub mod engine;
pub mod errors;
pub mod format;
pub mod list;
pub mod mutations;
pub mod paste;
pub mod protocol;
pub mod selection;
pub mod style;

pub use engine::Engine;
pub use errors::{EditorError, EditorResult};
pub use format::{format_state, toggle_format, FormatState};
pub use list::list_enter;
pub use paste::{
    paste_html, paste_image, paste_text, preprocess_html_for_paste, preprocess_text_for_paste,
};
pub use protocol::{Command, Event, FormatKind, ListKind, SelectionState, Severity};
pub use selection::{resolve_address, Anchor, Selection};
pub use style::{indent, outdent, replace_style, toggle_list_item};

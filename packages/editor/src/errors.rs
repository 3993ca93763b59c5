use markup_parser::ParseError;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by editing commands.
///
/// No error is fatal: a failed command leaves the document in its prior state
/// and the failure is reported to the host as an error event.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no resolvable selection")]
    NoSelection,

    #[error("offset {offset} out of bounds for node (len {len})")]
    InvalidOffset { offset: usize, len: usize },

    #[error("cannot merge <{left}> with <{right}>")]
    IncompatibleMerge { left: String, right: String },

    #[error("paste input could not be interpreted: {0}")]
    MalformedPasteInput(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EditorError {
    /// Code string used in error events.
    pub fn code(&self) -> &'static str {
        match self {
            EditorError::NoSelection => "no-selection",
            EditorError::InvalidOffset { .. } => "invalid-offset",
            EditorError::IncompatibleMerge { .. } => "incompatible-merge",
            EditorError::MalformedPasteInput(_) => "malformed-paste-input",
            EditorError::UnknownCommand(_) => "unknown-command",
            EditorError::Parse(_) => "parse-error",
        }
    }

    /// Whether the host should alert the user or just log.
    pub fn alerts_user(&self) -> bool {
        matches!(
            self,
            EditorError::MalformedPasteInput(_) | EditorError::UnknownCommand(_)
        )
    }
}

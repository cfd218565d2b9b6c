//! Client side model of the chat transcript: rendering, per message
//! editing, copying and the submit/stream lifecycle.

mod clipboard;
mod edit;
mod render;
mod session;

pub use clipboard::{Clipboard, CopyToClipboard, DEFAULT_COPY_TIMEOUT, TerminalClipboard};
pub use edit::{EditState, MessageEditor, SaveOutcome};
pub use render::{
    Block, Highlighter, PlainHighlighter, Segment, TYPING_CURSOR, TranscriptRenderer,
};
pub use session::{ChatSession, SessionError};

use std::io::Write;
use std::time::Duration;

use anyhow::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::time::Instant;

pub const DEFAULT_COPY_TIMEOUT: Duration = Duration::from_millis(2000);

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), Error>;
}

/// Copies through the terminal with the OSC 52 escape sequence, which
/// most terminal emulators forward to the system clipboard.
#[derive(Default)]
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), Error> {
        let mut stdout = std::io::stdout();
        write!(stdout, "\x1b]52;c;{}\x07", STANDARD.encode(text))?;
        stdout.flush()?;
        Ok(())
    }
}

/// Tracks whether something was just copied. While it is, further
/// copies are ignored until the timeout passes.
pub struct CopyToClipboard<C: Clipboard> {
    clipboard: C,
    timeout: Duration,
    copied_at: Option<Instant>,
}

impl<C: Clipboard> CopyToClipboard<C> {
    pub fn new(clipboard: C) -> Self {
        Self::with_timeout(clipboard, DEFAULT_COPY_TIMEOUT)
    }

    pub fn with_timeout(clipboard: C, timeout: Duration) -> Self {
        Self {
            clipboard,
            timeout,
            copied_at: None,
        }
    }

    pub fn is_copied(&self) -> bool {
        self.copied_at
            .is_some_and(|at| at.elapsed() < self.timeout)
    }

    /// Returns whether the clipboard was written.
    pub fn copy_to_clipboard(&mut self, text: &str) -> Result<bool, Error> {
        if self.is_copied() {
            return Ok(false);
        }
        self.clipboard.write_text(text)?;
        self.copied_at = Some(Instant::now());
        Ok(true)
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }
}

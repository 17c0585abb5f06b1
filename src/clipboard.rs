//! Clipboard access for the copy action.
//!
//! [`SystemClipboard`] is the default. [`Osc52Clipboard`] hands the text to
//! the terminal instead and is meant for sessions where the local clipboard
//! is out of reach (SSH, containers).

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ChatError;

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError>;
}

/// The desktop clipboard via `arboard`. The handle is opened on first use
/// and kept so the selection stays owned while the process runs.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clipboard_error(e: arboard::Error) -> ChatError {
    ChatError::Clipboard(e.to_string())
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(clipboard_error)?,
        };
        let written = clipboard.set_text(text.to_string()).map_err(clipboard_error);
        self.inner = Some(clipboard);
        written
    }
}

/// Terminal clipboard via the OSC 52 escape sequence. Only a write error is
/// reported; a terminal without OSC 52 support drops the sequence silently,
/// so this is opt-in (`--osc52`).
pub struct Osc52Clipboard<W: Write> {
    out: W,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// The escape sequence that sets the system clipboard to `text`.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError> {
        self.out
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| ChatError::Clipboard(e.to_string()))
    }
}

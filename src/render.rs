//! Terminal rendering of the chat view.
//!
//! User bubbles are right-aligned, bot bubbles left-aligned. Chunk kinds map
//! to headings (bold), bullets (`•`) and paragraphs; `<b>` spans become bold.

use colored::*;

use crate::markup::parse_inline;
use crate::message::ChatMessage;
use crate::protocol::{ApplicationLog, ChunkKind, StructuredChunk};

pub const DEFAULT_WIDTH: usize = 80;
const MIN_WIDTH: u16 = 20;
const RECENT_QUERY_CHARS: usize = 20;

/// Columns of the attached terminal, or [`DEFAULT_WIDTH`] when stdout is not
/// a terminal.
pub fn terminal_width() -> usize {
    width_or_default(crossterm::terminal::size())
}

fn width_or_default(size: std::io::Result<(u16, u16)>) -> usize {
    match size {
        Ok((width, _)) if width >= MIN_WIDTH => usize::from(width),
        _ => DEFAULT_WIDTH,
    }
}

/// Render chunk text with inline markup applied.
pub fn render_inline(content: &str) -> String {
    parse_inline(content)
        .into_iter()
        .map(|span| {
            if span.bold {
                span.text.bold().to_string()
            } else {
                span.text
            }
        })
        .collect()
}

/// One bot chunk as terminal text (no trailing newline).
pub fn render_chunk(chunk: &StructuredChunk) -> String {
    let text = render_inline(&chunk.content);
    match chunk.kind {
        ChunkKind::Heading => text.bold().bright_white().to_string(),
        ChunkKind::Bullet => format!("  • {}", text),
        ChunkKind::Paragraph => text,
    }
}

fn pad_right_aligned(line: &str, visible_len: usize, width: usize) -> String {
    let pad = width.saturating_sub(visible_len);
    format!("{}{}", " ".repeat(pad), line)
}

fn render_user_text(message: &ChatMessage, width: usize) -> String {
    let mut out = String::new();
    for line in message.plain_text().lines() {
        let shown = line.bright_cyan().to_string();
        out.push_str(&pad_right_aligned(&shown, line.chars().count(), width));
        out.push('\n');
    }
    out
}

fn render_header(message: &ChatMessage, width: usize) -> String {
    if message.is_user {
        pad_right_aligned(&"You".bright_yellow().bold().to_string(), 3, width) + "\n"
    } else {
        format!("{}\n", "Assistant".bright_green().bold())
    }
}

fn render_footer(message: &ChatMessage, width: usize) -> String {
    let ts = message.timestamp.dimmed().to_string();
    if message.is_user {
        pad_right_aligned(&ts, message.timestamp.chars().count(), width) + "\n\n"
    } else {
        format!("{}\n\n", ts)
    }
}

pub fn loading_line() -> String {
    format!("{}\n", "Loading...".dimmed())
}

/// One line per recent session: truncated first query and date.
pub fn render_recent(logs: &[ApplicationLog]) -> String {
    if logs.is_empty() {
        return "No recent chats\n".to_string();
    }
    let mut out = String::new();
    for log in logs {
        let query: String = if log.user_query.chars().count() > RECENT_QUERY_CHARS {
            let head: String = log.user_query.chars().take(RECENT_QUERY_CHARS).collect();
            format!("{}...", head)
        } else {
            log.user_query.clone()
        };
        let date = log.created_at.split('T').next().unwrap_or(&log.created_at);
        out.push_str(&format!(
            "{}  {}  {}\n",
            log.session_id.bright_blue(),
            query,
            date.dimmed()
        ));
    }
    out
}

/// Incremental printer. Tracks how much of the message list has already been
/// written so streaming chunks appear as they arrive.
#[derive(Debug, Default)]
pub struct Transcript {
    width: usize,
    message: usize,
    chunks: usize,
    header_done: bool,
}

impl Transcript {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Forget progress, e.g. after the message list was cleared.
    pub fn reset(&mut self) {
        *self = Self::new(self.width);
    }

    /// Text for everything not yet printed. Stops at a tail message that is
    /// still streaming; its remaining chunks come out on later calls. A
    /// streaming message that is no longer the tail can't grow any more and
    /// is printed to the end.
    pub fn drain(&mut self, messages: &[ChatMessage]) -> String {
        self.drain_until(messages, false)
    }

    /// Like [`drain`](Self::drain) but also closes off a streaming tail. Used
    /// when no more frames will arrive.
    pub fn finish(&mut self, messages: &[ChatMessage]) -> String {
        self.drain_until(messages, true)
    }

    fn drain_until(&mut self, messages: &[ChatMessage], settle_tail: bool) -> String {
        if messages.len() < self.message {
            self.reset();
        }
        let mut out = String::new();
        while let Some(message) = messages.get(self.message) {
            if !self.header_done {
                out.push_str(&render_header(message, self.width));
                if message.is_user {
                    out.push_str(&render_user_text(message, self.width));
                    self.chunks = message.content.len();
                }
                self.header_done = true;
            }
            if !message.is_user {
                for chunk in message.content.iter().skip(self.chunks) {
                    out.push_str(&render_chunk(chunk));
                    out.push('\n');
                }
                self.chunks = message.content.len();
            }
            let is_tail = self.message + 1 == messages.len();
            if message.is_streaming() && is_tail && !settle_tail {
                break;
            }
            out.push_str(&render_footer(message, self.width));
            self.message += 1;
            self.chunks = 0;
            self.header_done = false;
        }
        out
    }
}

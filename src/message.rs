use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::StructuredChunk;

/// Suffix appended to a bot message id once its stream has completed.
pub const COMPLETED_SUFFIX: &str = "-completed";

/// Whether a message can still receive chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Streaming,
    Sealed,
}

/// One bubble in the chat view.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub content: Vec<StructuredChunk>,
    pub is_user: bool,
    pub timestamp: String,
    pub state: MessageState,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        ChatMessage {
            id: now_ms().to_string(),
            content: vec![StructuredChunk::paragraph(text)],
            is_user: true,
            timestamp: local_timestamp(),
            state: MessageState::Sealed,
        }
    }

    /// A bot message that is still receiving chunks.
    pub fn streaming(session_id: Option<&str>, first: StructuredChunk) -> Self {
        ChatMessage {
            id: format!("{}-{}", session_id.unwrap_or("unknown"), now_ms()),
            content: vec![first],
            is_user: false,
            timestamp: local_timestamp(),
            state: MessageState::Streaming,
        }
    }

    /// A complete, single-paragraph bot message (errors, notices).
    pub fn notice(text: &str) -> Self {
        ChatMessage {
            id: format!("notice-{}{}", now_ms(), COMPLETED_SUFFIX),
            content: vec![StructuredChunk::paragraph(text)],
            is_user: false,
            timestamp: local_timestamp(),
            state: MessageState::Sealed,
        }
    }

    /// A complete bot message with a recorded chunk sequence.
    pub fn sealed_bot(id: String, content: Vec<StructuredChunk>, timestamp: String) -> Self {
        ChatMessage {
            id,
            content,
            is_user: false,
            timestamp,
            state: MessageState::Sealed,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state == MessageState::Streaming
    }

    /// Accepts further chunks only while streaming from the bot.
    pub fn accepts_chunks(&self) -> bool {
        !self.is_user && self.is_streaming()
    }

    /// Stop accepting chunks. The id gains the completed suffix; sealing twice
    /// is a no-op.
    pub fn seal(&mut self) {
        if self.state == MessageState::Sealed {
            return;
        }
        self.state = MessageState::Sealed;
        self.id.push_str(COMPLETED_SUFFIX);
    }

    /// Plain text of the message: chunk contents joined by newlines.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Current Unix epoch in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Local wall-clock time for bubble captions.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

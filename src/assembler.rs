//! Streaming assembler: folds inbound frames into the ordered message list.
//!
//! The fold has two states, building and idle, read off the tail of the list:
//! a streaming bot message at the tail means a response is being built.
//! Frames are applied in delivery order; nothing is reordered or deduplicated.

use crate::message::ChatMessage;
use crate::protocol::InboundFrame;

/// Text shown when an inbound frame cannot be parsed.
pub const PROCESSING_ERROR_TEXT: &str = "Error processing response";

/// What a single frame did to the message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Session id carried by the frame, for the caller to bind if unset.
    pub session_id: Option<String>,
    pub appended_chunk: bool,
    /// A new bot message was started by this frame's chunk.
    pub started_message: bool,
    pub completed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Assembler {
    messages: Vec<ChatMessage>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
    }

    /// True while the tail is a bot message still receiving chunks.
    pub fn is_building(&self) -> bool {
        self.messages.last().is_some_and(ChatMessage::accepts_chunks)
    }

    /// Most recent message written by the user.
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_user)
    }

    /// Parse and apply one raw text frame. Parse failures become a visible
    /// error message and are otherwise ignored.
    pub fn apply_raw(&mut self, text: &str, session_hint: Option<&str>) -> FrameOutcome {
        match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => self.apply(frame, session_hint),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                self.messages.push(ChatMessage::notice(PROCESSING_ERROR_TEXT));
                FrameOutcome {
                    error: Some(PROCESSING_ERROR_TEXT.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// Apply one parsed frame.
    ///
    /// `session_hint` names the bound session and is used for new message ids;
    /// when unset the frame's own `session_id` is used instead.
    pub fn apply(&mut self, frame: InboundFrame, session_hint: Option<&str>) -> FrameOutcome {
        let mut outcome = FrameOutcome {
            session_id: frame.session_id.clone(),
            ..Default::default()
        };
        let completed = frame.is_completed();

        if let Some(chunk) = frame.chunk {
            outcome.appended_chunk = true;
            match self.messages.last_mut() {
                Some(last) if last.accepts_chunks() => last.content.push(chunk),
                _ => {
                    let id_session = session_hint.or(frame.session_id.as_deref());
                    self.messages.push(ChatMessage::streaming(id_session, chunk));
                    outcome.started_message = true;
                }
            }
        }

        if completed {
            if let Some(last) = self.messages.last_mut() {
                if last.accepts_chunks() {
                    last.seal();
                    outcome.completed = true;
                }
            }
        }

        if let Some(error) = frame.error {
            self.messages.push(ChatMessage::notice(&error));
            outcome.error = Some(error);
        }

        outcome
    }
}

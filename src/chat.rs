//! Chat view state and intent dispatch.
//!
//! `ChatController` is the single owner of everything the chat view shows:
//! the session, the message list, the socket, the selected collection and
//! the pending input. The event loop in `main` is its only caller, so no
//! state here is shared or locked.

use tokio::sync::mpsc;

use crate::assembler::{Assembler, FrameOutcome};
use crate::clipboard::Clipboard;
use crate::error::ChatError;
use crate::history::{load_history, HistoryOutcome, LogStore};
use crate::message::ChatMessage;
use crate::protocol::OutboundFrame;
use crate::session::SessionManager;
use crate::transport::{Channel, ChannelEvent, ChannelState, ChannelUpdate, NOT_CONNECTED_TEXT};

pub const CONFIG_ERROR_TEXT: &str =
    "Backend address is not configured. Set CHAT_API_BASE_URL or pass --api-base-url.";
pub const COPY_OK_TEXT: &str = "Copied to clipboard!";
pub const COPY_FAILED_TEXT: &str = "Failed to copy to clipboard.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Transient status line shown after an action such as copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    fn success(text: &str) -> Self {
        Self {
            kind: NotificationKind::Success,
            text: text.to_string(),
        }
    }

    fn failure(text: &str) -> Self {
        Self {
            kind: NotificationKind::Failure,
            text: text.to_string(),
        }
    }
}

/// What a channel event meant for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Connected { flushed: usize },
    Frame(FrameOutcome),
    Disconnected { reason: String, undelivered: usize },
    Nothing,
}

pub struct ChatController {
    session: SessionManager,
    messages: Assembler,
    channel: Channel,
    collection: Option<String>,
    input: String,
    loading: bool,
}

impl ChatController {
    /// Build a controller for `endpoint` (`None` when no backend address is
    /// configured). The returned receiver carries socket events; feed each one
    /// to [`handle_channel_event`](Self::handle_channel_event).
    pub fn new(
        endpoint: Option<String>,
        collection: Option<String>,
        resumed_session: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (channel, events) = Channel::new(endpoint);
        let controller = ChatController {
            session: SessionManager::with_resumed(resumed_session),
            messages: Assembler::new(),
            channel,
            collection: collection.filter(|c| !c.is_empty()),
            input: String::new(),
            loading: false,
        };
        (controller, events)
    }

    /// View mount: make sure a session exists. Returns true when the session
    /// was resumed and its history should be loaded.
    pub fn mount(&mut self) -> bool {
        self.session.ensure();
        self.session.is_resumed()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.current()
    }

    pub fn location(&self) -> Option<String> {
        self.session.location()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_streaming(&self) -> bool {
        self.messages.is_building()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Pick the collection subsequent questions are asked against. An empty
    /// name means "no collection".
    pub fn select_collection(&mut self, collection: Option<String>) {
        self.collection = collection.filter(|c| !c.trim().is_empty());
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Send the pending input as a normal user message.
    pub fn send_input(&mut self) -> bool {
        if self.input.trim().is_empty() {
            return false;
        }
        let text = std::mem::take(&mut self.input);
        self.send(&text, true)
    }

    /// Send `text` to the backend. Normal sends add a user bubble;
    /// regeneration sends (`is_user_send == false`) do not.
    ///
    /// Returns whether a frame was handed to the channel.
    pub fn send(&mut self, text: &str, is_user_send: bool) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if is_user_send {
            self.messages.push(ChatMessage::user(text));
        }
        let session_id = self.session.ensure().to_string();
        let frame = OutboundFrame::chat(text, self.collection.as_deref(), Some(&session_id));

        match self.channel.send(frame) {
            Ok(outcome) => {
                tracing::debug!(?outcome, is_user_send, "chat frame issued");
                self.loading = true;
                true
            }
            Err(ChatError::MissingBackend) => {
                self.messages.push(ChatMessage::notice(CONFIG_ERROR_TEXT));
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.messages
                    .push(ChatMessage::notice(&format!("{}: {}", NOT_CONNECTED_TEXT, e)));
                false
            }
        }
    }

    /// Re-ask the most recent user question without adding a new bubble.
    pub fn regenerate(&mut self) -> bool {
        let Some(text) = self.messages.last_user_message().map(ChatMessage::plain_text) else {
            return false;
        };
        self.send(&text, false)
    }

    /// Ask the backend to stop the current response.
    pub fn stop(&mut self) -> bool {
        self.loading = false;
        match self.channel.stop(self.session.current()) {
            Ok(sent) => sent,
            Err(e) => {
                tracing::warn!(error = %e, "stop failed");
                false
            }
        }
    }

    /// Send a `close` action and drop the socket (used on exit).
    pub fn close(&mut self) {
        if let Err(e) = self.channel.close(self.session.current()) {
            tracing::warn!(error = %e, "close failed");
        }
    }

    /// Fresh session: new id, empty message list, empty input.
    pub fn start_new_session(&mut self) -> String {
        self.messages.clear();
        self.input.clear();
        self.loading = false;
        self.session.start_new()
    }

    /// Switch to an existing session taken from navigation state. The message
    /// list is cleared; call [`load_history`](Self::load_history) next.
    pub fn open_session(&mut self, session_id: String) {
        self.messages.clear();
        self.input.clear();
        self.loading = false;
        self.session.resume(session_id);
    }

    /// The server-side logs of `session_id` were deleted. If it was the
    /// current session, move to a new one. Returns whether that happened.
    pub fn forget_session(&mut self, session_id: &str) -> bool {
        if self.session.current() == Some(session_id) {
            self.start_new_session();
            true
        } else {
            false
        }
    }

    /// Load history for a resumed session. Locally created sessions have no
    /// history and are skipped (`None`).
    ///
    /// A session without rows is replaced by a new one; a failed fetch leaves
    /// one error message in the list.
    pub async fn load_history<S: LogStore>(&mut self, store: &S) -> Option<HistoryOutcome> {
        if !self.session.is_resumed() {
            return None;
        }
        let session_id = self.session.current()?.to_string();
        let outcome = load_history(store, &session_id, &mut self.messages).await;
        match &outcome {
            HistoryOutcome::StaleSession => {
                self.start_new_session();
            }
            HistoryOutcome::Failed(reason) => {
                self.messages.push(ChatMessage::notice(&format!(
                    "Failed to load chat history: {}",
                    reason
                )));
            }
            HistoryOutcome::Seeded(_) | HistoryOutcome::AlreadyPopulated => {}
        }
        Some(outcome)
    }

    /// Fold one socket event into the view state.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) -> ChatEvent {
        match self.channel.handle_event(event) {
            ChannelUpdate::Opened { flushed } => ChatEvent::Connected { flushed },
            ChannelUpdate::Frame(text) => {
                let outcome = self.messages.apply_raw(&text, self.session.current());
                if let Some(server_id) = &outcome.session_id {
                    self.session.adopt(server_id);
                }
                if outcome.appended_chunk || outcome.error.is_some() || outcome.completed {
                    self.loading = false;
                }
                ChatEvent::Frame(outcome)
            }
            ChannelUpdate::Dropped { reason, undelivered } => {
                self.loading = false;
                if !undelivered.is_empty() {
                    self.messages.push(ChatMessage::notice(NOT_CONNECTED_TEXT));
                }
                ChatEvent::Disconnected {
                    reason,
                    undelivered: undelivered.len(),
                }
            }
            ChannelUpdate::Ignored => ChatEvent::Nothing,
        }
    }

    /// Copy message `index` to the clipboard as plain text.
    pub fn copy<C: Clipboard + ?Sized>(&self, index: usize, clipboard: &mut C) -> Notification {
        let Some(message) = self.messages().get(index) else {
            return Notification::failure("No such message.");
        };
        match clipboard.write_text(&message.plain_text()) {
            Ok(()) => Notification::success(COPY_OK_TEXT),
            Err(e) => {
                tracing::warn!(error = %e, "copy failed");
                Notification::failure(COPY_FAILED_TEXT)
            }
        }
    }

    /// Index of the newest bot message, the default target for copy.
    pub fn last_response_index(&self) -> Option<usize> {
        self.messages().iter().rposition(|m| !m.is_user)
    }
}

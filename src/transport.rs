//! Transport channel: one WebSocket to the chat backend.
//!
//! ## Design
//! - `Channel` is owned by the chat loop and is the only thing that touches
//!   the socket reference.
//! - Each connection runs in its own task; it talks back to the owner only
//!   through the `ChannelEvent` queue returned by [`Channel::new`].
//! - Every connection attempt gets a generation number. Events tagged with an
//!   older generation are ignored, so a dead socket can never be revived.
//!
//! ## Lifecycle
//! `Absent → Connecting → Open`, and `Closed`/`Failed` drop back to `Absent`.
//! A `send` while not open queues the frame and connects; the queue is
//! flushed once, in order, when the socket opens. There is no retry loop,
//! no backoff and no heartbeat.

use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::ChatError;
use crate::protocol::{Action, OutboundFrame};

/// Message shown when frames could not be delivered.
pub const NOT_CONNECTED_TEXT: &str = "WebSocket not connected";

/// Observable channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Absent,
    Connecting,
    Open,
}

/// Event reported by a connection task.
#[derive(Debug)]
pub enum ChannelEvent {
    Connected {
        generation: u64,
        outbound: mpsc::UnboundedSender<WsMessage>,
    },
    Inbound {
        generation: u64,
        text: String,
    },
    Closed {
        generation: u64,
        reason: Option<String>,
    },
    Failed {
        generation: u64,
        error: String,
    },
}

impl ChannelEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ChannelEvent::Connected { generation, .. }
            | ChannelEvent::Inbound { generation, .. }
            | ChannelEvent::Closed { generation, .. }
            | ChannelEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Result of feeding an event back into the channel.
#[derive(Debug, PartialEq)]
pub enum ChannelUpdate {
    /// The socket opened; `flushed` queued frames were written.
    Opened { flushed: usize },
    /// A text frame arrived.
    Frame(String),
    /// The socket went away. Frames that never reached a socket are handed
    /// back so the caller can report them.
    Dropped {
        reason: String,
        undelivered: Vec<OutboundFrame>,
    },
    /// Event from an old generation, or one with no effect.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Waiting for the connection to open.
    Queued,
}

enum Link {
    Absent,
    Connecting,
    Open(mpsc::UnboundedSender<WsMessage>),
}

pub struct Channel {
    endpoint: Option<String>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    link: Link,
    generation: u64,
    pending: VecDeque<OutboundFrame>,
}

impl Channel {
    /// Create a channel for `endpoint` (`None` when no backend is configured)
    /// together with the event queue the owner must drain into
    /// [`handle_event`](Self::handle_event).
    pub fn new(endpoint: Option<String>) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let channel = Channel {
            endpoint,
            events,
            link: Link::Absent,
            generation: 0,
            pending: VecDeque::new(),
        };
        (channel, rx)
    }

    pub fn state(&self) -> ChannelState {
        match self.link {
            Link::Absent => ChannelState::Absent,
            Link::Connecting => ChannelState::Connecting,
            Link::Open(_) => ChannelState::Open,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Open a socket unless one is open or on its way. Must be called from
    /// within a tokio runtime.
    pub fn connect(&mut self) -> Result<(), ChatError> {
        let endpoint = self.endpoint.clone().ok_or(ChatError::MissingBackend)?;
        if !matches!(self.link, Link::Absent) {
            return Ok(());
        }
        self.generation += 1;
        self.link = Link::Connecting;
        tracing::info!(endpoint = %endpoint, generation = self.generation, "connecting");
        tokio::spawn(run_connection(endpoint, self.generation, self.events.clone()));
        Ok(())
    }

    /// Deliver a frame, connecting first if needed.
    pub fn send(&mut self, frame: OutboundFrame) -> Result<SendOutcome, ChatError> {
        if !self.is_configured() {
            return Err(ChatError::MissingBackend);
        }
        if let Link::Open(outbound) = &self.link {
            let text = frame.to_json()?;
            if outbound.send(WsMessage::Text(text)).is_ok() {
                tracing::debug!(action = ?frame.action, "frame sent");
                return Ok(SendOutcome::Delivered);
            }
            // Writer task is gone; the socket is dead even if no event said so yet.
            tracing::warn!("socket writer closed, reconnecting");
            self.link = Link::Absent;
        }
        self.pending.push_back(frame);
        self.connect()?;
        Ok(SendOutcome::Queued)
    }

    /// Ask the backend to stop streaming. Does nothing unless open; the
    /// socket stays up either way.
    pub fn stop(&mut self, session_id: Option<&str>) -> Result<bool, ChatError> {
        self.send_control(Action::Stop, session_id)
    }

    /// Tell the backend the conversation is over and drop the socket.
    pub fn close(&mut self, session_id: Option<&str>) -> Result<bool, ChatError> {
        let sent = self.send_control(Action::Close, session_id)?;
        if let Link::Open(outbound) = &self.link {
            let _ = outbound.send(WsMessage::Close(None));
        }
        self.link = Link::Absent;
        self.pending.clear();
        Ok(sent)
    }

    fn send_control(&mut self, action: Action, session_id: Option<&str>) -> Result<bool, ChatError> {
        let Link::Open(outbound) = &self.link else {
            return Ok(false);
        };
        let text = OutboundFrame::control(action, session_id).to_json()?;
        Ok(outbound.send(WsMessage::Text(text)).is_ok())
    }

    /// Fold a connection event into the channel state.
    pub fn handle_event(&mut self, event: ChannelEvent) -> ChannelUpdate {
        if event.generation() != self.generation {
            tracing::debug!(stale = event.generation(), current = self.generation, "ignoring stale event");
            return ChannelUpdate::Ignored;
        }
        match event {
            ChannelEvent::Connected { outbound, .. } => {
                if !matches!(self.link, Link::Connecting) {
                    // Closed by the owner while the handshake was in flight.
                    let _ = outbound.send(WsMessage::Close(None));
                    return ChannelUpdate::Ignored;
                }
                let mut flushed = 0;
                while let Some(frame) = self.pending.pop_front() {
                    match frame.to_json() {
                        Ok(text) => {
                            if outbound.send(WsMessage::Text(text)).is_err() {
                                self.pending.push_front(frame);
                                break;
                            }
                            flushed += 1;
                        }
                        Err(e) => tracing::warn!(error = %e, "dropping unencodable frame"),
                    }
                }
                tracing::info!(flushed, "websocket connected");
                self.link = Link::Open(outbound);
                ChannelUpdate::Opened { flushed }
            }
            ChannelEvent::Inbound { text, .. } => {
                if matches!(self.link, Link::Open(_)) {
                    ChannelUpdate::Frame(text)
                } else {
                    ChannelUpdate::Ignored
                }
            }
            ChannelEvent::Closed { reason, .. } => {
                let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                tracing::info!(%reason, "websocket closed");
                self.drop_link(reason)
            }
            ChannelEvent::Failed { error, .. } => {
                tracing::warn!(%error, "websocket error");
                self.drop_link(error)
            }
        }
    }

    fn drop_link(&mut self, reason: String) -> ChannelUpdate {
        if matches!(self.link, Link::Absent) {
            return ChannelUpdate::Ignored;
        }
        self.link = Link::Absent;
        ChannelUpdate::Dropped {
            reason,
            undelivered: self.pending.drain(..).collect(),
        }
    }
}

/// Connection task: handshake, then pump frames both ways until either side
/// goes away.
async fn run_connection(
    endpoint: String,
    generation: u64,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let stream = match tokio_tungstenite::connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let _ = events.send(ChannelEvent::Failed {
                generation,
                error: e.to_string(),
            });
            return;
        }
    };

    let (mut sink, mut source) = stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<WsMessage>();
    if events
        .send(ChannelEvent::Connected {
            generation,
            outbound,
        })
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                match out {
                    Some(WsMessage::Close(frame)) => {
                        let _ = sink.send(WsMessage::Close(frame)).await;
                        break;
                    }
                    Some(msg) => {
                        if let Err(e) = sink.send(msg).await {
                            let _ = events.send(ChannelEvent::Failed { generation, error: e.to_string() });
                            break;
                        }
                    }
                    // Owner dropped the link.
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        if events.send(ChannelEvent::Inbound { generation, text }).is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame.map(|f| format!("{} {}", u16::from(f.code), f.reason));
                        let _ = events.send(ChannelEvent::Closed { generation, reason });
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore binary / ping / pong frames
                    Some(Err(e)) => {
                        let _ = events.send(ChannelEvent::Failed { generation, error: e.to_string() });
                        break;
                    }
                    None => {
                        let _ = events.send(ChannelEvent::Closed { generation, reason: None });
                        break;
                    }
                }
            }
        }
    }
}

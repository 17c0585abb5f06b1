//! # docchat
//!
//! Terminal client for a document-grounded chat backend. Answers stream over
//! a single WebSocket as typed chunks (heading / bullet / paragraph) and are
//! folded into an ordered message list; sessions are identified by a token
//! that travels in every frame and in the `?sessionId=` location.
//!
//! ## Layout
//! - [`transport`]: the one socket, lazy connect, reconnect-on-send.
//! - [`assembler`]: folds inbound frames into [`message::ChatMessage`]s.
//! - [`session`]: current session id, creation and server adoption.
//! - [`history`]: seeds the list from the backend log store.
//! - [`chat`]: the controller tying these together for the view.
//! - [`api`]: REST endpoints for collections, documents and logs.

pub mod api;
pub mod assembler;
pub mod chat;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod history;
pub mod location;
pub mod markup;
pub mod message;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;

pub use chat::{ChatController, ChatEvent};
pub use error::ChatError;

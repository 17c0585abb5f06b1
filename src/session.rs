//! Session identity: which conversation the client is talking in.

use crate::location::session_location;

/// Where the current session id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Generated on this client.
    Local,
    /// Taken from navigation state (`--session`, `/open`).
    Resumed,
    /// Adopted from the first server frame.
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub origin: SessionOrigin,
}

/// Owns the single active session.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Option<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from navigation state, if any.
    pub fn with_resumed(id: Option<String>) -> Self {
        let mut manager = Self::new();
        if let Some(id) = id {
            manager.resume(id);
        }
        manager
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// True when the session came from navigation state, i.e. history may
    /// exist for it on the server.
    pub fn is_resumed(&self) -> bool {
        matches!(
            self.current,
            Some(Session {
                origin: SessionOrigin::Resumed,
                ..
            })
        )
    }

    /// Return the current session, creating one if none exists.
    pub fn ensure(&mut self) -> &str {
        if self.current.is_none() {
            self.start_new();
        }
        self.current().unwrap_or_default()
    }

    /// Replace the current session with a freshly generated one.
    pub fn start_new(&mut self) -> String {
        let previous = self.current().map(str::to_string);
        let mut id = uuid::Uuid::new_v4().to_string();
        while previous.as_deref() == Some(id.as_str()) {
            id = uuid::Uuid::new_v4().to_string();
        }
        tracing::debug!(session_id = %id, "started new session");
        self.current = Some(Session {
            id: id.clone(),
            origin: SessionOrigin::Local,
        });
        id
    }

    /// Bind a server-issued session id. Only takes effect when no session is
    /// set; returns whether it was adopted.
    pub fn adopt(&mut self, server_id: &str) -> bool {
        if self.current.is_some() || server_id.is_empty() {
            return false;
        }
        tracing::debug!(session_id = %server_id, "adopted server session");
        self.current = Some(Session {
            id: server_id.to_string(),
            origin: SessionOrigin::Server,
        });
        true
    }

    pub fn resume(&mut self, id: String) {
        self.current = Some(Session {
            id,
            origin: SessionOrigin::Resumed,
        });
    }

    /// Navigable location for the current session (`?sessionId=...`).
    pub fn location(&self) -> Option<String> {
        self.current().map(session_location)
    }
}

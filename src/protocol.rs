use serde::{Deserialize, Serialize};

/// Status value the backend sends once a response stream is finished.
pub const STATUS_COMPLETED: &str = "completed";

// -- Structured chunks ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Heading,
    Bullet,
    Paragraph,
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkKind::Heading => write!(f, "heading"),
            ChunkKind::Bullet => write!(f, "bullet"),
            ChunkKind::Paragraph => write!(f, "paragraph"),
        }
    }
}

/// A typed fragment of a bot response. Never modified after it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredChunk {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub content: String,
}

impl StructuredChunk {
    pub fn new(kind: ChunkKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::Paragraph, content)
    }
}

// -- WebSocket frames -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Chat,
    Stop,
    Close,
    Open,
}

/// Client → server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Outer `None` omits the field; `Some(None)` sends an explicit `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl OutboundFrame {
    pub fn chat(message: &str, collection: Option<&str>, session_id: Option<&str>) -> Self {
        Self {
            action: Action::Chat,
            message: Some(message.to_string()),
            collection_name: Some(collection.map(str::to_string)),
            session_id: session_id.map(str::to_string),
        }
    }

    /// A bare control frame (`stop`, `close`, `open`) carrying only the session.
    pub fn control(action: Action, session_id: Option<&str>) -> Self {
        Self {
            action,
            message: None,
            collection_name: None,
            session_id: session_id.map(str::to_string),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server → client frame. Every field is optional; one frame may carry
/// several of them at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<StructuredChunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InboundFrame {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_COMPLETED)
    }
}

// -- REST payloads ----------------------------------------------------------

/// One persisted chat turn from the backend log store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationLog {
    pub id: i64,
    pub session_id: String,
    pub user_query: String,
    #[serde(default)]
    pub model_response: Vec<StructuredChunk>,
    #[serde(default)]
    pub model: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileRequest {
    pub file_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

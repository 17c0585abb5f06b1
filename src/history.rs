//! Chat history loader: seeds the message list from the backend log store.

use std::future::Future;

use crate::assembler::Assembler;
use crate::error::ChatError;
use crate::message::{ChatMessage, COMPLETED_SUFFIX};
use crate::protocol::ApplicationLog;

/// Read access to persisted chat turns.
pub trait LogStore {
    fn application_logs(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<ApplicationLog>, ChatError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// The list was empty and now holds this many messages.
    Seeded(usize),
    /// Rows exist but the list already had messages, so nothing was added.
    AlreadyPopulated,
    /// The store knows nothing about this session.
    StaleSession,
    /// The fetch failed; carries a user-facing reason.
    Failed(String),
}

/// Turn one log row into its user query and model response bubbles.
pub fn log_to_messages(log: &ApplicationLog) -> [ChatMessage; 2] {
    let timestamp = display_time(&log.created_at);
    let mut query = ChatMessage::user(&log.user_query);
    query.id = format!("{}-query", log.id);
    query.timestamp = timestamp.clone();
    let response = ChatMessage::sealed_bot(
        format!("{}-response{}", log.id, COMPLETED_SUFFIX),
        log.model_response.clone(),
        timestamp,
    );
    [query, response]
}

/// Fetch the logs for `session_id` and seed `messages` if it is empty.
pub async fn load_history<S: LogStore>(
    store: &S,
    session_id: &str,
    messages: &mut Assembler,
) -> HistoryOutcome {
    let logs = match store.application_logs(session_id).await {
        Ok(logs) => logs,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "history fetch failed");
            return HistoryOutcome::Failed(e.to_string());
        }
    };

    if logs.is_empty() {
        tracing::info!(session_id, "no history for session");
        return HistoryOutcome::StaleSession;
    }
    if !messages.is_empty() {
        return HistoryOutcome::AlreadyPopulated;
    }

    messages.extend(logs.iter().flat_map(log_to_messages));
    tracing::debug!(session_id, rows = logs.len(), "history seeded");
    HistoryOutcome::Seeded(messages.len())
}

/// `2024-05-01T10:00:00.123` → `10:00:00`. Unparseable values pass through.
fn display_time(created_at: &str) -> String {
    created_at
        .split_once('T')
        .map(|(_, time)| time.chars().take(8).collect())
        .unwrap_or_else(|| created_at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageState;
    use crate::protocol::{ChunkKind, StructuredChunk};

    struct FakeStore {
        rows: Result<Vec<ApplicationLog>, u16>,
    }

    impl LogStore for FakeStore {
        async fn application_logs(&self, _session_id: &str) -> Result<Vec<ApplicationLog>, ChatError> {
            match &self.rows {
                Ok(rows) => Ok(rows.clone()),
                Err(status) => Err(ChatError::Http {
                    status: *status,
                    url: "http://localhost:8000/get-application-logs".into(),
                }),
            }
        }
    }

    fn row(id: i64, query: &str) -> ApplicationLog {
        ApplicationLog {
            id,
            session_id: "s".into(),
            user_query: query.into(),
            model_response: vec![
                StructuredChunk::new(ChunkKind::Heading, "Answer"),
                StructuredChunk::paragraph(format!("re: {}", query)),
            ],
            model: "mixtral_v0_1".into(),
            created_at: "2024-05-01T10:11:12.345".into(),
        }
    }

    #[test]
    fn test_log_to_messages_pairs() {
        let [q, r] = log_to_messages(&row(3, "what?"));
        assert!(q.is_user);
        assert_eq!(q.plain_text(), "what?");
        assert!(!r.is_user);
        assert_eq!(r.state, MessageState::Sealed);
        assert_eq!(r.content.len(), 2);
        assert_eq!(q.timestamp, "10:11:12");
    }

    #[test]
    fn test_display_time_passthrough() {
        assert_eq!(display_time("yesterday"), "yesterday");
    }

    #[tokio::test]
    async fn test_seeds_empty_list() {
        let store = FakeStore { rows: Ok(vec![row(1, "a"), row(2, "b")]) };
        let mut messages = Assembler::new();
        let out = load_history(&store, "s", &mut messages).await;
        assert_eq!(out, HistoryOutcome::Seeded(4));
        let texts: Vec<String> = messages.messages().iter().map(|m| m.plain_text()).collect();
        assert_eq!(texts[0], "a");
        assert_eq!(texts[2], "b");
        assert!(!messages.is_building());
    }

    #[tokio::test]
    async fn test_does_not_seed_non_empty_list() {
        let store = FakeStore { rows: Ok(vec![row(1, "a")]) };
        let mut messages = Assembler::new();
        messages.push(ChatMessage::user("typed already"));
        let out = load_history(&store, "s", &mut messages).await;
        assert_eq!(out, HistoryOutcome::AlreadyPopulated);
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_rows_is_stale() {
        let store = FakeStore { rows: Ok(vec![]) };
        let mut messages = Assembler::new();
        assert_eq!(load_history(&store, "s", &mut messages).await, HistoryOutcome::StaleSession);
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let store = FakeStore { rows: Err(500) };
        let mut messages = Assembler::new();
        match load_history(&store, "s", &mut messages).await {
            HistoryOutcome::Failed(reason) => assert!(reason.contains("500")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(messages.is_empty());
    }
}

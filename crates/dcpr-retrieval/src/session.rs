//! Conversation sessions.
//!
//! Each session owns an ordered list of turns. A question is answered against
//! a snapshot of the history, and the user and assistant turns are appended
//! together only once the pipeline succeeds, so a failed request never leaves
//! a partial exchange behind.

use chrono::{DateTime, Local, Utc};
use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::{Role, Turn};
use dcpr_llm::ports::{CrossEncoder, Embedder};
use dcpr_store::ports::VectorIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::models::{CitedSource, RetrievalResult, TranscriptEntry};
use crate::pipeline::RetrievalPipeline;
use crate::stages::LanguageStages;

const TITLE_CHARS: usize = 20;

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = DcprError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| DcprError::SessionNotFound { id: s.to_string() })
    }
}

#[derive(Debug, Clone)]
struct Session {
    default_title: String,
    created_at: DateTime<Utc>,
    turns: Vec<Turn>,

    /// Sources of each assistant turn, keyed by turn index
    cited: BTreeMap<usize, Vec<CitedSource>>,
}

impl Session {
    fn new() -> Self {
        Self {
            default_title: format!("Chat {}", Local::now().format("%H:%M")),
            created_at: Utc::now(),
            turns: Vec::new(),
            cited: BTreeMap::new(),
        }
    }

    fn record_exchange(&mut self, question: &str, result: &RetrievalResult) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(result.answer.clone()));
        self.cited.insert(
            self.turns.len() - 1,
            result.passages_used.iter().map(CitedSource::from).collect(),
        );
    }

    fn transcript(&self) -> Vec<TranscriptEntry> {
        self.turns
            .iter()
            .enumerate()
            .map(|(i, turn)| TranscriptEntry {
                turn: turn.clone(),
                sources: self.cited.get(&i).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// First user message cut to a short label, or the creation-time title
    fn title(&self) -> String {
        let Some(first) = self.turns.iter().find(|t| t.role == Role::User) else {
            return self.default_title.clone();
        };

        let label: String = first.content.chars().take(TITLE_CHARS).collect();
        format!("{}...", label)
    }
}

/// Listing entry for a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub turn_count: usize,
}

/// In-memory store of conversation sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty session
    pub fn create(&self) -> SessionId {
        let id = SessionId::new();
        self.write().insert(id, Session::new());
        tracing::debug!(session_id = %id, "Session created");
        id
    }

    /// All sessions, most recently created first
    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.read();
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, session)| SessionSummary {
                id: *id,
                title: session.title(),
                created_at: session.created_at,
                turn_count: session.turns.len(),
            })
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub fn summary(&self, id: SessionId) -> Result<SessionSummary> {
        let sessions = self.read();
        let session = sessions.get(&id).ok_or_else(|| not_found(id))?;
        Ok(SessionSummary {
            id,
            title: session.title(),
            created_at: session.created_at,
            turn_count: session.turns.len(),
        })
    }

    /// A copy of the session's turns
    pub fn history(&self, id: SessionId) -> Result<Vec<Turn>> {
        self.read().get(&id).map(|s| s.turns.clone()).ok_or_else(|| not_found(id))
    }

    /// The session's turns with the sources each answer drew on
    pub fn transcript(&self, id: SessionId) -> Result<Vec<TranscriptEntry>> {
        self.read().get(&id).map(Session::transcript).ok_or_else(|| not_found(id))
    }

    /// Forget every turn, keeping the session
    pub fn clear(&self, id: SessionId) -> Result<()> {
        let mut sessions = self.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.turns.clear();
        session.cited.clear();
        tracing::debug!(session_id = %id, "Session history cleared");
        Ok(())
    }

    pub fn delete(&self, id: SessionId) -> Result<()> {
        self.write().remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    /// Answer `question` within session `id`.
    ///
    /// No lock is held while the pipeline runs.
    pub async fn ask<L, E, V, C>(
        &self,
        id: SessionId,
        question: &str,
        pipeline: &RetrievalPipeline<L, E, V, C>,
    ) -> Result<RetrievalResult>
    where
        L: LanguageStages,
        E: Embedder,
        V: VectorIndex,
        C: CrossEncoder,
    {
        let history = self.history(id)?;

        tracing::info!(event = "user_query", session_id = %id, content = question, "User query");

        let result = match pipeline.answer_question(question, &history).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    event = "error",
                    session_id = %id,
                    transient = e.is_transient(),
                    error = %e,
                    "Question failed"
                );
                return Err(e);
            }
        };

        tracing::info!(
            event = "ai_response",
            session_id = %id,
            content = %result.answer,
            passages = result.passages_used.len(),
            "Assistant response"
        );

        let mut sessions = self.write();
        match sessions.get_mut(&id) {
            Some(session) => session.record_exchange(question, &result),
            None => tracing::warn!(session_id = %id, "Session deleted while answering"),
        }

        Ok(result)
    }

    /// Record thumbs-up/down feedback on an assistant turn as a log event.
    /// Feedback is not stored.
    pub fn record_feedback(
        &self,
        id: SessionId,
        turn: usize,
        positive: bool,
        comment: Option<&str>,
    ) -> Result<()> {
        let sessions = self.read();
        let session = sessions.get(&id).ok_or_else(|| not_found(id))?;

        let role = session.turns.get(turn).map(|t| t.role);
        if role != Some(Role::Assistant) {
            return Err(DcprError::InvalidRequest(format!(
                "turn {} is not an assistant response in session {}",
                turn, id
            )));
        }

        tracing::info!(
            event = "user_feedback",
            session_id = %id,
            turn,
            score = if positive { "up" } else { "down" },
            comment = comment.unwrap_or(""),
            "User feedback"
        );

        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(id: SessionId) -> DcprError {
    DcprError::SessionNotFound { id: id.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_clock_title() {
        let store = SessionStore::new();
        let id = store.create();

        let summary = store.summary(id).unwrap();
        assert!(summary.title.starts_with("Chat "));
        assert_eq!(summary.turn_count, 0);
        assert!(store.history(id).unwrap().is_empty());
    }

    #[test]
    fn test_title_from_first_user_message() {
        let mut session = Session::new();
        session.turns.push(Turn::user("What is the base FSI for residential plots?"));
        session.turns.push(Turn::assistant("[Reg 30] ..."));

        assert_eq!(session.title(), "What is the base FSI...");
    }

    fn answered(answer: &str, regulations: &[&str]) -> RetrievalResult {
        use crate::models::RankedPassage;
        use dcpr_core::models::{Passage, PassageId, PassageMetadata, StructuredQuery};
        use std::sync::Arc;

        RetrievalResult {
            answer: answer.to_string(),
            passages_used: regulations
                .iter()
                .enumerate()
                .map(|(i, regulation)| RankedPassage {
                    passage: Arc::new(Passage {
                        id: PassageId(i as u64),
                        text: format!("{} text", regulation),
                        embedding: vec![],
                        metadata: PassageMetadata::new().with("regulation_id", *regulation),
                    }),
                    similarity: 0.9,
                    relevance: 2.0 - i as f32,
                })
                .collect(),
            standalone_question: String::new(),
            structured_query: StructuredQuery::unfiltered(""),
            rejected: Vec::new(),
            candidates_considered: regulations.len(),
        }
    }

    #[test]
    fn test_transcript_keeps_sources_per_answer() {
        let mut session = Session::new();
        session.record_exchange("base FSI?", &answered("[Reg 30] 1.33", &["Reg 30", "Table 12"]));
        session.record_exchange("and cluster?", &answered("[Reg 33(9)] 4.0", &["Reg 33(9)"]));

        let transcript = session.transcript();
        let cited = |i: usize| -> Vec<Option<String>> {
            transcript[i].sources.iter().map(|s| s.regulation_id.clone()).collect()
        };

        assert_eq!(transcript.len(), 4);
        assert!(transcript[0].sources.is_empty());
        assert_eq!(cited(1), vec![Some("Reg 30".to_string()), Some("Table 12".to_string())]);
        assert_eq!(cited(3), vec![Some("Reg 33(9)".to_string())]);
        assert_eq!(transcript[3].turn, Turn::assistant("[Reg 33(9)] 4.0"));
        assert_eq!(transcript[1].sources[0].excerpt, "Reg 30 text");
    }

    #[test]
    fn test_clear_drops_sources() {
        let store = SessionStore::new();
        let id = store.create();
        store.write().get_mut(&id).unwrap().record_exchange("q", &answered("a", &["Reg 30"]));

        store.clear(id).unwrap();
        {
            let mut sessions = store.write();
            let turns = &mut sessions.get_mut(&id).unwrap().turns;
            turns.push(Turn::user("q"));
            turns.push(Turn::assistant("a"));
        }

        let transcript = store.transcript(id).unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[1].sources.is_empty());
    }

    #[test]
    fn test_clear_and_delete() {
        let store = SessionStore::new();
        let id = store.create();
        store.write().get_mut(&id).unwrap().turns.push(Turn::user("hi"));

        store.clear(id).unwrap();
        assert!(store.history(id).unwrap().is_empty());

        store.delete(id).unwrap();
        assert!(matches!(store.history(id), Err(DcprError::SessionNotFound { .. })));
        assert!(store.delete(id).is_err());
    }

    #[test]
    fn test_list_most_recent_first() {
        let store = SessionStore::new();
        let first = store.create();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create();

        let ids: Vec<SessionId> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_session_id_parsing() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!(matches!(
            "not-a-uuid".parse::<SessionId>(),
            Err(DcprError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_feedback_requires_assistant_turn() {
        let store = SessionStore::new();
        let id = store.create();
        {
            let mut sessions = store.write();
            let turns = &mut sessions.get_mut(&id).unwrap().turns;
            turns.push(Turn::user("q"));
            turns.push(Turn::assistant("a"));
        }

        assert!(store.record_feedback(id, 1, true, Some("helpful")).is_ok());
        assert!(store.record_feedback(id, 0, false, None).is_err());
        assert!(store.record_feedback(id, 9, false, None).is_err());
    }
}

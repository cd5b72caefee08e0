//! Session Store
//!
//! Keeps every study session in memory for the lifetime of the process.
//! Nothing is persisted; a restart starts from an empty store.
//!
//! A turn reads a session, awaits the generation runtime and writes the
//! session back. Callers hold the guard from [`SessionStore::begin_turn`]
//! across that span, so connections sharing a session take turns one at a
//! time.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use study_partner_core::session::StudySession;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::models::{Message, Session, SessionDetail, SessionStatus};

/// A study session together with its ownership and timestamps.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub session: StudySession,
}

impl StoredSession {
    pub fn summary(&self) -> Session {
        let phase = self.session.phase();
        Session {
            id: self.id,
            user_id: self.user_id.clone(),
            subject: self.session.scenario().subject.clone(),
            phase: phase.label().to_string(),
            status: if phase.is_terminal() {
                SessionStatus::Ended
            } else {
                SessionStatus::Active
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.session
            .turns()
            .iter()
            .enumerate()
            .map(|(i, turn)| Message::from_turn(i, turn))
            .collect()
    }

    pub fn detail(&self) -> SessionDetail {
        SessionDetail {
            session: self.summary(),
            user_position: self.session.user_option().map(str::to_string),
            agent_position: self.session.agent_option().map(str::to_string),
            checkpoints: self.session.checkpoints(),
            messages: self.messages(),
        }
    }
}

/// Thread-safe in-memory map of sessions keyed by id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
    turns: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly opened session for `user_id`.
    pub async fn create_session(&self, user_id: &str, session: StudySession) -> Session {
        let now = Utc::now();
        let stored = StoredSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            session,
        };
        let summary = stored.summary();
        self.sessions.write().await.insert(stored.id, stored);
        summary
    }

    /// Waits until no other turn runs on `session_id` and reserves it until
    /// the returned guard is dropped.
    pub async fn begin_turn(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .turns
            .lock()
            .await
            .entry(session_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Retrieves a single session by its ID, scoped to a specific user.
    pub async fn get_session(&self, session_id: Uuid, user_id: &str) -> Option<StoredSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .filter(|s| s.user_id == user_id)
            .cloned()
    }

    /// Lists a user's sessions, newest first.
    pub async fn list_sessions(&self, user_id: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .map(StoredSession::summary)
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// Replaces the stored discussion state after a completed turn.
    pub async fn save_session(&self, session_id: Uuid, session: StudySession) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&session_id)
            .ok_or_else(|| anyhow!("Session '{}' not found", session_id))?;
        stored.session = session;
        stored.updated_at = Utc::now();
        Ok(stored.summary())
    }
}

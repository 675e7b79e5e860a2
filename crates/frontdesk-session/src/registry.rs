//! Registry of live sessions, for the inbound control surface.
//!
//! A session is registered as soon as the API creates it and replaced by the
//! live handle once a call loop starts driving it. `end` only signals the
//! session's cancellation token; a running session winds down on its own,
//! writes its summary, and reports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::costs::CostAccountant;
use crate::orchestrator::SessionPhase;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared view of one running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub room_name: String,
    pub started_at: DateTime<Utc>,
    /// Cancelling this token asks the session to wind down.
    pub cancel: CancellationToken,
    pub phase: Arc<Mutex<SessionPhase>>,
    pub costs: Arc<Mutex<CostAccountant>>,
}

impl SessionHandle {
    /// Handle for a session that is registered but not yet driving a call.
    pub fn pending(room_name: String) -> Self {
        Self {
            room_name,
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
            phase: Arc::new(Mutex::new(SessionPhase::Connecting)),
            costs: Arc::new(Mutex::new(CostAccountant::default())),
        }
    }
}

/// Point-in-time view of one session, as served by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub room_name: String,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub usage: CostAccountant,
}

/// Tracks every live session. Cheap to clone; all clones share one map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its id.
    pub async fn register(&self, session_id: Uuid, handle: SessionHandle) {
        self.sessions.write().await.insert(session_id, handle);
        tracing::debug!(%session_id, "session registered");
    }

    /// The room a session is connected to, if it is live.
    pub async fn room_name(&self, session_id: Uuid) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|handle| handle.room_name.clone())
    }

    /// Snapshot of one live session.
    pub async fn snapshot(&self, session_id: Uuid) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|handle| snapshot_of(session_id, handle))
    }

    /// Snapshots of every live session, oldest first.
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut all: Vec<SessionSnapshot> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| snapshot_of(*id, handle))
            .collect();
        all.sort_by_key(|s| s.started_at);
        all
    }

    /// Asks a live session to end. Returns whether the session was live.
    pub async fn end(&self, session_id: Uuid) -> bool {
        match self.sessions.read().await.get(&session_id) {
            Some(handle) => {
                handle.cancel.cancel();
                tracing::info!(%session_id, "session asked to end");
                true
            }
            None => false,
        }
    }

    /// Drops a finished session from the registry.
    pub async fn remove(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
        tracing::debug!(%session_id, "session removed");
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn snapshot_of(session_id: Uuid, handle: &SessionHandle) -> SessionSnapshot {
    SessionSnapshot {
        session_id,
        room_name: handle.room_name.clone(),
        phase: *lock(&handle.phase),
        started_at: handle.started_at,
        usage: *lock(&handle.costs),
    }
}

//! In-memory registry of live learn sessions.
//!
//! Sessions are independent of each other. The registry lock is only held to
//! look up, insert or remove a session; each session has its own mutex.
//! Finished sessions are released by the handlers; anything a client walked
//! away from is abandoned by [`SessionStore::sweep`] once it outlives the TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use learnflow_core::StageSequencer;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::services::recorder::ClientMicrophone;

/// One live session and the microphone feeding it.
#[derive(Debug)]
pub struct LiveSession {
    pub sequencer: StageSequencer,
    pub microphone: ClientMicrophone,
    pub started_at: DateTime<Utc>,
}

impl LiveSession {
    pub fn new(sequencer: StageSequencer, microphone: ClientMicrophone) -> Self {
        Self {
            sequencer,
            microphone,
            started_at: Utc::now(),
        }
    }
}

pub type SharedSession = Arc<Mutex<LiveSession>>;

#[derive(Debug)]
struct StoredSession {
    started_at: DateTime<Utc>,
    shared: SharedSession,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: LiveSession) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let started_at = session.started_at;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            StoredSession {
                started_at,
                shared: shared.clone(),
            },
        );
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|stored| stored.shared.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|stored| stored.shared)
    }

    /// Forget the session if it has reached a terminal state.
    ///
    /// The caller holds the session's lock, so the terminal view it is about
    /// to serve is the last one.
    pub async fn release_if_over(&self, id: Uuid, live: &LiveSession) -> bool {
        if !live.sequencer.state().is_terminal() {
            return false;
        }
        let released = self.sessions.write().await.remove(&id).is_some();
        if released {
            tracing::debug!(session_id = %id, "Released finished session");
        }
        released
    }

    /// Abandon and drop every session started before `now - ttl`.
    pub async fn sweep(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return 0;
        };

        let expired: Vec<(Uuid, SharedSession)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, stored)| stored.started_at < cutoff)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|stored| (id, stored.shared)))
                .collect()
        };

        for (id, shared) in &expired {
            let abandoned = shared.lock().await.sequencer.abandon();
            tracing::info!(session_id = %id, abandoned, "Expired session");
        }
        expired.len()
    }

    /// Run [`SessionStore::sweep`] every `every` for the life of the process.
    pub fn spawn_sweeper(self: Arc<Self>, ttl: Duration, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            loop {
                ticks.tick().await;
                let expired = self.sweep(ttl, Utc::now()).await;
                if expired > 0 {
                    let remaining = self.len().await;
                    tracing::debug!(expired, remaining, "Swept sessions");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

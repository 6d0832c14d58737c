//! Session store: in-memory map of outreach sessions with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::OutreachSession;
use crate::error::SessionError;

/// Default idle time before a session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct Entry {
    session: OutreachSession,
    last_seen: Instant,
}

/// Sessions keyed by id. Lost on restart; dropped after `ttl` without access.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Add a session and return its id. Idle sessions are swept first.
    pub async fn insert(&self, session: OutreachSession) -> Uuid {
        let id = session.id();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let swept = Self::sweep(&mut sessions, now, self.ttl);
        sessions.insert(
            id,
            Entry {
                session,
                last_seen: now,
            },
        );
        info!(session = %id, swept, active = sessions.len(), "Session created");
        id
    }

    /// Run `f` against a session under the write lock and mark it as seen.
    ///
    /// `f` is synchronous so the lock is never held across a network call.
    /// An expired session is removed and reported as not found.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut OutreachSession) -> R,
    ) -> Result<R, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if now.duration_since(entry.last_seen) >= self.ttl {
            sessions.remove(&id);
            debug!(session = %id, "Session expired on access");
            return Err(SessionError::NotFound(id));
        }
        entry.last_seen = now;
        Ok(f(&mut entry.session))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session = %id, "Session removed");
        }
        removed
    }

    /// Drop every session idle for at least the TTL.
    ///
    /// Returns the number of sessions dropped.
    pub async fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let swept = Self::sweep(&mut sessions, Instant::now(), self.ttl);
        if swept > 0 {
            info!(count = swept, "Expired idle sessions");
        }
        swept
    }

    fn sweep(sessions: &mut HashMap<Uuid, Entry>, now: Instant, ttl: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, e| now.duration_since(e.last_seen) < ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Spawn a background task that sweeps idle sessions every minute.
pub fn spawn_expiry_task(store: Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            store.expire_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;

    #[tokio::test]
    async fn insert_and_access() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL);
        let id = store.insert(OutreachSession::new(Roster::empty())).await;
        assert_eq!(store.len().await, 1);

        let size = store.with_session(id, |s| s.roster().len()).await.unwrap();
        assert_eq!(size, 0);

        store
            .with_session(id, |s| s.set_search("roe"))
            .await
            .unwrap();
        let query = store.with_session(id, |s| s.snapshot().query).await.unwrap();
        assert_eq!(query, "roe");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL);
        let missing = Uuid::new_v4();
        let err = store.with_session(missing, |_| ()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn remove_session() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL);
        let id = store.insert(OutreachSession::new(Roster::empty())).await;
        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_expires() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.insert(OutreachSession::new(Roster::empty())).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let err = store.with_session(id, |_| ()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(missing) if missing == id));
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn access_keeps_session_alive() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.insert(OutreachSession::new(Roster::empty())).await;

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(45)).await;
            store.with_session(id, |_| ()).await.unwrap();
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_and_sweep_drop_idle_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let old = store.insert(OutreachSession::new(Roster::empty())).await;

        tokio::time::advance(Duration::from_secs(90)).await;
        let fresh = store.insert(OutreachSession::new(Roster::empty())).await;
        assert_eq!(store.len().await, 1);
        assert!(store.with_session(old, |_| ()).await.is_err());
        assert!(store.with_session(fresh, |_| ()).await.is_ok());

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(store.expire_idle().await, 1);
        assert!(store.is_empty().await);
    }
}

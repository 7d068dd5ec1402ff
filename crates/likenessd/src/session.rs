//! Per-user session state and the store that tracks live sessions.
//!
//! Each user has at most one session, owned exclusively by its worker
//! task. The store only keeps the worker's queue sender; session data
//! itself never leaves the worker.

use crate::intake::StorageHandle;
use crate::reply::Reply;
use chrono::{DateTime, Utc};
use likeness_core::wire::CommandName;
use likeness_core::Embedding;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot, Mutex};

pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingFirstPhoto,
    AwaitingSecondPhoto,
}

/// One user's progress through the two-photo workflow.
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    /// Temporary storage of the first photo, held until the session
    /// leaves `AwaitingSecondPhoto` or is destroyed.
    pub first_photo: Option<StorageHandle>,
    /// Set iff the first photo passed validation and extraction.
    pub first_embedding: Option<Embedding>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            state: SessionState::Idle,
            first_photo: None,
            first_embedding: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Release all owned storage and return to `Idle`. Safe to call on
    /// every exit path; releasing twice is a no-op.
    pub async fn reset(&mut self) {
        if let Some(mut handle) = self.first_photo.take() {
            handle.release().await;
        }
        self.first_embedding = None;
        self.state = SessionState::Idle;
    }
}

/// Transport-level event routed to a session worker.
#[derive(Debug)]
pub enum SessionEvent {
    Command(CommandName),
    Photo(Vec<u8>),
    Text,
    /// Process teardown: clean up silently and exit the worker.
    Shutdown,
}

/// One queued event plus the channel its reply goes back on. `None`
/// means the event was deliberately ignored.
pub struct SessionEnvelope {
    pub event: SessionEvent,
    pub reply: oneshot::Sender<Option<Reply>>,
}

struct WorkerSlot {
    generation: u64,
    tx: mpsc::Sender<SessionEnvelope>,
}

/// Maps user ids to their live session workers.
///
/// Generations let an exiting worker retire only its own entry; a worker
/// replaced after expiry never removes its successor.
pub struct SessionStore {
    workers: Mutex<HashMap<UserId, WorkerSlot>>,
    next_generation: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Route an envelope to the user's worker, creating one via `spawn`
    /// if none is live. The map lock is held across the enqueue so one
    /// user's events keep their arrival order.
    ///
    /// Returns the envelope when the user's queue is full.
    pub async fn route<F>(
        &self,
        user_id: &str,
        envelope: SessionEnvelope,
        spawn: F,
    ) -> Result<(), SessionEnvelope>
    where
        F: Fn(UserId, u64) -> mpsc::Sender<SessionEnvelope>,
    {
        let mut workers = self.workers.lock().await;

        if let Some(slot) = workers.get(user_id) {
            if !slot.tx.is_closed() {
                return match slot.tx.try_send(envelope) {
                    Ok(()) => Ok(()),
                    Err(mpsc::error::TrySendError::Full(env)) => Err(env),
                    Err(mpsc::error::TrySendError::Closed(env)) => {
                        // Worker expired between the check and the send.
                        Self::install(&mut workers, user_id, env, &spawn, &self.next_generation)
                    }
                };
            }
        }

        Self::install(&mut workers, user_id, envelope, &spawn, &self.next_generation)
    }

    fn install<F>(
        workers: &mut HashMap<UserId, WorkerSlot>,
        user_id: &str,
        envelope: SessionEnvelope,
        spawn: &F,
        next_generation: &AtomicU64,
    ) -> Result<(), SessionEnvelope>
    where
        F: Fn(UserId, u64) -> mpsc::Sender<SessionEnvelope>,
    {
        let generation = next_generation.fetch_add(1, Ordering::Relaxed);
        let tx = spawn(user_id.to_string(), generation);
        let result = tx.try_send(envelope).map_err(|e| e.into_inner());
        workers.insert(user_id.to_string(), WorkerSlot { generation, tx });
        result
    }

    /// Remove the user's entry, but only if it still belongs to the
    /// retiring worker.
    pub async fn retire(&self, user_id: &str, generation: u64) {
        let mut workers = self.workers.lock().await;
        if workers
            .get(user_id)
            .map(|slot| slot.generation)
            == Some(generation)
        {
            workers.remove(user_id);
        }
    }

    /// Take every live worker sender, emptying the store. Used for
    /// process shutdown.
    pub async fn drain(&self) -> Vec<(UserId, mpsc::Sender<SessionEnvelope>)> {
        let mut workers = self.workers.lock().await;
        workers
            .drain()
            .map(|(user, slot)| (user, slot.tx))
            .collect()
    }

    #[cfg(test)]
    pub async fn live_sessions(&self) -> usize {
        self.workers.lock().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{ImageIntake, PhotoSlot};
    use uuid::Uuid;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    async fn stored_handle() -> StorageHandle {
        let root = std::env::temp_dir().join(format!("likeness-session-{}", Uuid::new_v4()));
        let intake = ImageIntake::new(root).unwrap();
        intake
            .store("7", PhotoSlot::First, &PNG_MAGIC)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reset_releases_storage_and_clears_state() {
        let mut session = Session::new("7".into());
        let handle = stored_handle().await;
        let path = handle.path().to_path_buf();

        session.state = SessionState::AwaitingSecondPhoto;
        session.first_photo = Some(handle);
        session.first_embedding = Some(Embedding {
            values: vec![0.1, 0.2],
            model_version: None,
        });

        session.reset().await;

        assert_eq!(session.state, SessionState::Idle);
        assert!(session.first_photo.is_none());
        assert!(session.first_embedding.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reset_twice_is_harmless() {
        let mut session = Session::new("7".into());
        session.reset().await;
        session.reset().await;
        assert_eq!(session.state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_retire_ignores_newer_generation() {
        let store = SessionStore::new();
        let (tx, _rx) = mpsc::channel(1);
        let envelope = SessionEnvelope {
            event: SessionEvent::Text,
            reply: oneshot::channel().0,
        };
        store
            .route("7", envelope, move |_, _| tx.clone())
            .await
            .ok();
        assert_eq!(store.live_sessions().await, 1);

        // A stale worker (wrong generation) must not evict the live one.
        store.retire("7", 999).await;
        assert_eq!(store.live_sessions().await, 1);

        store.retire("7", 0).await;
        assert_eq!(store.live_sessions().await, 0);
    }
}

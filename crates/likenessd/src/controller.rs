//! The orchestrating state machine.
//!
//! Every user gets a dedicated worker task that owns the `Session`
//! exclusively and consumes events in strict arrival order from a bounded
//! queue. Engine calls run on the blocking pool, so one user's inference
//! never stalls another user's worker. A worker that sees no events for
//! the configured inactivity window tears the session down and exits.

use crate::config::Config;
use crate::intake::{ImageIntake, IntakeError, PhotoSlot};
use crate::reply::Reply;
use crate::session::{
    Session, SessionEnvelope, SessionEvent, SessionState, SessionStore, UserId,
};
use likeness_core::scorer::EuclideanScorer;
use likeness_core::wire::{CommandName, GatewayReply};
use likeness_core::{validator, EmbeddingOutcome, FaceEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub struct SessionController {
    inner: Arc<Inner>,
}

impl Clone for SessionController {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner {
    engine: Arc<dyn FaceEngine>,
    intake: ImageIntake,
    store: SessionStore,
    session_timeout: Duration,
    queue_depth: usize,
    /// Best-effort channel for unsolicited messages (expiry notices).
    notice_tx: mpsc::Sender<GatewayReply>,
}

impl SessionController {
    pub fn new(
        engine: Arc<dyn FaceEngine>,
        intake: ImageIntake,
        config: &Config,
        notice_tx: mpsc::Sender<GatewayReply>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                intake,
                store: SessionStore::new(),
                session_timeout: config.session_timeout,
                queue_depth: config.session_queue_depth,
                notice_tx,
            }),
        }
    }

    /// Enqueue an event for the user's session, creating the session
    /// worker if needed, and hand back the reply channel. Enqueueing is
    /// cheap; callers that must not block other users await the receiver
    /// in a separate task.
    ///
    /// `Err` means the user's queue is full and the event was not taken.
    pub async fn submit(
        &self,
        user_id: &str,
        event: SessionEvent,
    ) -> Result<oneshot::Receiver<Option<Reply>>, ()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = SessionEnvelope {
            event,
            reply: ack_tx,
        };

        let inner = self.inner.clone();
        let routed = self
            .inner
            .store
            .route(user_id, envelope, move |user, generation| {
                spawn_worker(inner.clone(), user, generation)
            })
            .await;

        match routed {
            Ok(()) => Ok(ack_rx),
            Err(_envelope) => {
                tracing::warn!(user = user_id, "session queue full, event refused");
                Err(())
            }
        }
    }

    /// Submit an event and wait for its reply.
    pub async fn dispatch(&self, user_id: &str, event: SessionEvent) -> Option<Reply> {
        match self.submit(user_id, event).await {
            Ok(ack_rx) => ack_rx.await.unwrap_or(None),
            Err(()) => Some(Reply::Busy),
        }
    }

    /// Tear down every live session, releasing all owned storage. Called
    /// on process shutdown.
    pub async fn shutdown(&self) {
        let workers = self.inner.store.drain().await;
        let count = workers.len();
        for (user_id, tx) in workers {
            let (ack_tx, ack_rx) = oneshot::channel();
            let envelope = SessionEnvelope {
                event: SessionEvent::Shutdown,
                reply: ack_tx,
            };
            if tx.send(envelope).await.is_ok() {
                let _ = ack_rx.await;
            }
            tracing::debug!(user = %user_id, "session torn down");
        }
        tracing::info!(sessions = count, "all sessions torn down");
    }
}

fn spawn_worker(
    inner: Arc<Inner>,
    user_id: UserId,
    generation: u64,
) -> mpsc::Sender<SessionEnvelope> {
    let (tx, mut rx) = mpsc::channel::<SessionEnvelope>(inner.queue_depth);

    tokio::spawn(async move {
        let mut session = Session::new(user_id.clone());
        tracing::debug!(user = %user_id, created_at = %session.created_at, "session worker started");

        loop {
            match tokio::time::timeout(inner.session_timeout, rx.recv()).await {
                Ok(Some(envelope)) => {
                    let is_shutdown = matches!(envelope.event, SessionEvent::Shutdown);
                    let reply = handle_event(&inner, &mut session, envelope.event).await;
                    let _ = envelope.reply.send(reply);
                    if is_shutdown {
                        break;
                    }
                }
                Ok(None) => {
                    // All senders gone; nothing more can arrive.
                    session.reset().await;
                    break;
                }
                Err(_) => {
                    expire(&inner, &mut session).await;
                    break;
                }
            }
        }

        inner.store.retire(&user_id, generation).await;
        tracing::debug!(user = %user_id, "session worker exited");
    });

    tx
}

/// Inactivity teardown: equivalent to cancel, but the notice is
/// best-effort only.
async fn expire(inner: &Inner, session: &mut Session) {
    if session.state == SessionState::Idle {
        return;
    }
    tracing::info!(
        user = %session.user_id,
        state = ?session.state,
        last_activity = %session.last_activity,
        "session expired after inactivity"
    );
    session.reset().await;

    let notice = GatewayReply {
        user_id: session.user_id.clone(),
        text: Reply::Expired.text(),
    };
    if inner.notice_tx.try_send(notice).is_err() {
        tracing::debug!(user = %session.user_id, "expiry notice dropped");
    }
}

/// The transition table: current state × event → handler.
async fn handle_event(
    inner: &Inner,
    session: &mut Session,
    event: SessionEvent,
) -> Option<Reply> {
    session.touch();

    match event {
        SessionEvent::Command(CommandName::Start) => Some(Reply::Greeting),
        SessionEvent::Command(CommandName::Help) => Some(Reply::Help),
        SessionEvent::Command(CommandName::Begin) => {
            // Defensive reset: any prior embedding or storage goes first.
            session.reset().await;
            session.state = SessionState::AwaitingFirstPhoto;
            tracing::info!(user = %session.user_id, "comparison started");
            Some(Reply::BeginPrompt)
        }
        SessionEvent::Command(CommandName::Cancel) => {
            tracing::info!(user = %session.user_id, state = ?session.state, "comparison cancelled");
            session.reset().await;
            Some(Reply::Cancelled)
        }
        SessionEvent::Shutdown => {
            session.reset().await;
            None
        }
        SessionEvent::Text => match session.state {
            SessionState::Idle => None,
            _ => Some(Reply::InvalidFormat),
        },
        SessionEvent::Photo(bytes) => match session.state {
            SessionState::Idle => {
                tracing::debug!(user = %session.user_id, "photo ignored outside a comparison");
                None
            }
            SessionState::AwaitingFirstPhoto => {
                Some(handle_first_photo(inner, session, &bytes).await)
            }
            SessionState::AwaitingSecondPhoto => {
                Some(handle_second_photo(inner, session, &bytes).await)
            }
        },
    }
}

async fn handle_first_photo(inner: &Inner, session: &mut Session, bytes: &[u8]) -> Reply {
    let mut handle = match inner
        .intake
        .store(&session.user_id, PhotoSlot::First, bytes)
        .await
    {
        Ok(handle) => handle,
        Err(e) => return intake_failure(session, e).await,
    };

    match validate_stored(inner, handle.path()).await {
        EmbeddingOutcome::Ok(embedding) => {
            session.first_embedding = Some(embedding);
            session.first_photo = Some(handle);
            session.state = SessionState::AwaitingSecondPhoto;
            tracing::info!(user = %session.user_id, "first photo accepted");
            Reply::FirstPhotoAccepted
        }
        outcome => {
            // Retry in place: only the failed attempt's file is dropped.
            handle.release().await;
            rejection_reply(session, outcome)
        }
    }
}

async fn handle_second_photo(inner: &Inner, session: &mut Session, bytes: &[u8]) -> Reply {
    let mut handle = match inner
        .intake
        .store(&session.user_id, PhotoSlot::Second, bytes)
        .await
    {
        Ok(handle) => handle,
        Err(e) => return intake_failure(session, e).await,
    };

    let second = match validate_stored(inner, handle.path()).await {
        EmbeddingOutcome::Ok(embedding) => embedding,
        outcome => {
            // The first embedding stays; only the second image is released.
            handle.release().await;
            return rejection_reply(session, outcome);
        }
    };
    handle.release().await;

    let reply = match session.first_embedding.as_ref() {
        Some(first) => match EuclideanScorer.compare(first, &second) {
            Ok(comparison) => {
                tracing::info!(
                    user = %session.user_id,
                    distance = comparison.distance,
                    similarity = comparison.similarity_percent,
                    tier = ?comparison.tier,
                    "comparison complete"
                );
                Reply::ComparisonDone {
                    similarity_percent: comparison.similarity_percent,
                    tier: comparison.tier,
                }
            }
            Err(e) => {
                tracing::warn!(user = %session.user_id, error = %e, "comparison failed");
                Reply::ComparisonFailed
            }
        },
        None => {
            tracing::error!(user = %session.user_id, "no first embedding in AwaitingSecondPhoto");
            Reply::ComparisonFailed
        }
    };

    // Terminal for this run, success or not.
    session.reset().await;
    reply
}

/// Run the validator on the blocking pool; inference is latency-bearing.
async fn validate_stored(inner: &Inner, path: &Path) -> EmbeddingOutcome {
    let engine = inner.engine.clone();
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || validator::validate(engine.as_ref(), &path)).await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "validator task panicked");
            EmbeddingOutcome::ExtractionFailed
        }
    }
}

fn rejection_reply(session: &Session, outcome: EmbeddingOutcome) -> Reply {
    let reply = match outcome {
        EmbeddingOutcome::NoFace => Reply::NoFaceDetected,
        EmbeddingOutcome::MultipleFaces(count) => Reply::MultipleFacesDetected(count),
        EmbeddingOutcome::ExtractionFailed | EmbeddingOutcome::Ok(_) => Reply::ExtractionFailed,
    };
    tracing::info!(user = %session.user_id, state = ?session.state, reply = ?reply, "photo rejected");
    reply
}

async fn intake_failure(session: &mut Session, error: IntakeError) -> Reply {
    match error {
        IntakeError::UnsupportedFormat => Reply::InvalidFormat,
        e if e.is_fatal() => {
            tracing::error!(user = %session.user_id, error = %e, "storage unavailable, tearing session down");
            session.reset().await;
            Reply::StorageUnavailable
        }
        e => {
            tracing::warn!(user = %session.user_id, error = %e, "photo intake failed");
            Reply::IntakeFailed
        }
    }
}

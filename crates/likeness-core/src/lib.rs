//! likeness-core — Domain types for the two-photo face comparison workflow.
//!
//! Holds the embedding and scoring types, the contract for the external
//! embedding service, and the wire types shared with gateway clients.
//! Everything stateful (sessions, storage, transport) lives in `likenessd`.

pub mod engine;
pub mod scorer;
pub mod types;
pub mod validator;
pub mod wire;

pub use engine::{EngineError, FaceEngine};
pub use types::{Comparison, ConfidenceTier, Embedding, EmbeddingOutcome, FaceBox};

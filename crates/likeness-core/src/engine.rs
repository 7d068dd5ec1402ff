//! Contract for the external embedding service.
//!
//! The face detection and embedding models run out of process; `likenessd`
//! talks to them through [`FaceEngine`]. The wire types below define the
//! JSON Lines protocol an engine implementation speaks over its socket.

use crate::types::{Embedding, FaceBox};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine io: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine protocol: {0}")]
    Protocol(String),
    #[error("engine backend: {0}")]
    Backend(String),
    #[error("embedding service unavailable at {0}")]
    Unavailable(String),
}

/// Face localization and embedding extraction, consumed as an opaque
/// capability. Both calls are latency-bearing; callers are expected to run
/// them off the async executor.
pub trait FaceEngine: Send + Sync {
    /// Locate all faces in the image at `image`.
    fn locate_faces(&self, image: &Path) -> Result<Vec<FaceBox>, EngineError>;

    /// Extract an embedding for one located face. `Ok(None)` means the
    /// model could not produce a vector for that face.
    fn extract(&self, image: &Path, face: &FaceBox) -> Result<Option<Embedding>, EngineError>;
}

/// Request sent to the embedding service, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineRequest {
    LocateFaces { image: PathBuf },
    Extract { image: PathBuf, face: FaceBox },
}

/// Response from the embedding service, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineResponse {
    Faces { faces: Vec<FaceBox> },
    Embedding { embedding: Option<Embedding> },
    Error { message: String },
}

//! Temporary storage for inbound photo payloads.
//!
//! Each stored photo gets a uniquely named file scoped to `(user, slot)`,
//! so concurrent users and a user's two slots never collide. The returned
//! [`StorageHandle`] owns the file; release is idempotent and must be
//! attempted on every exit path.

use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Which of the session's two photo slots a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSlot {
    First,
    Second,
}

impl PhotoSlot {
    pub fn tag(&self) -> &'static str {
        match self {
            PhotoSlot::First => "first",
            PhotoSlot::Second => "second",
        }
    }
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("payload is not a decodable image")]
    UnsupportedFormat,
    #[error("temporary storage unavailable: {0}")]
    Unavailable(std::io::Error),
    #[error("failed to persist photo: {0}")]
    Write(std::io::Error),
}

impl IntakeError {
    /// Systemic storage failure: the session cannot stay retryable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IntakeError::Unavailable(_))
    }
}

/// Ownership token for one temporary image file.
#[derive(Debug)]
pub struct StorageHandle {
    path: PathBuf,
    released: bool,
}

impl StorageHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file. Idempotent: releasing an already-released
    /// or missing file is a no-op, never an error.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "photo released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "photo release failed")
            }
        }
    }
}

impl Drop for StorageHandle {
    // Last-resort cleanup to keep the crash leak window small.
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Persists photo payloads under a temp root it owns.
pub struct ImageIntake {
    root: PathBuf,
}

impl ImageIntake {
    pub fn new(root: PathBuf) -> Result<Self, IntakeError> {
        std::fs::create_dir_all(&root).map_err(IntakeError::Unavailable)?;
        Ok(Self { root })
    }

    /// Persist a photo payload and hand ownership of the file back.
    ///
    /// Rejects payloads whose magic bytes do not match a supported image
    /// format before touching disk.
    pub async fn store(
        &self,
        user_id: &str,
        slot: PhotoSlot,
        bytes: &[u8],
    ) -> Result<StorageHandle, IntakeError> {
        image::guess_format(bytes).map_err(|_| IntakeError::UnsupportedFormat)?;

        let name = format!(
            "{}-{}-{}.img",
            sanitize(user_id),
            slot.tag(),
            Uuid::new_v4()
        );
        let path = self.root.join(name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            match e.kind() {
                // The root vanished or is not writable: systemic, not transient.
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    IntakeError::Unavailable(e)
                }
                _ => IntakeError::Write(e),
            }
        })?;

        tracing::debug!(
            user = user_id,
            slot = slot.tag(),
            path = %path.display(),
            size = bytes.len(),
            "photo stored"
        );

        Ok(StorageHandle {
            path,
            released: false,
        })
    }
}

/// User ids are opaque strings from the transport; keep only filename-safe
/// characters when embedding them in paths.
fn sanitize(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

//! Client for the out-of-process embedding service.
//!
//! One short-lived connection per request: send one JSON line, read one
//! JSON line back. The service sees the same filesystem, so images are
//! passed by path. All calls block; the controller runs them on the
//! blocking pool.

use likeness_core::engine::{EngineRequest, EngineResponse};
use likeness_core::{Embedding, EngineError, FaceBox, FaceEngine};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

pub struct RemoteEngine {
    socket_path: PathBuf,
}

impl RemoteEngine {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    fn request(&self, request: &EngineRequest) -> Result<EngineResponse, EngineError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .map_err(|_| EngineError::Unavailable(self.socket_path.display().to_string()))?;

        let mut line = serde_json::to_string(request)
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        serde_json::from_str(response_line.trim())
            .map_err(|e| EngineError::Protocol(format!("bad response: {e}")))
    }
}

impl FaceEngine for RemoteEngine {
    fn locate_faces(&self, image: &Path) -> Result<Vec<FaceBox>, EngineError> {
        match self.request(&EngineRequest::LocateFaces {
            image: image.to_path_buf(),
        })? {
            EngineResponse::Faces { faces } => Ok(faces),
            EngineResponse::Error { message } => Err(EngineError::Backend(message)),
            other => Err(EngineError::Protocol(format!(
                "unexpected response to locate_faces: {other:?}"
            ))),
        }
    }

    fn extract(&self, image: &Path, face: &FaceBox) -> Result<Option<Embedding>, EngineError> {
        match self.request(&EngineRequest::Extract {
            image: image.to_path_buf(),
            face: face.clone(),
        })? {
            EngineResponse::Embedding { embedding } => Ok(embedding),
            EngineResponse::Error { message } => Err(EngineError::Backend(message)),
            other => Err(EngineError::Protocol(format!(
                "unexpected response to extract: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use uuid::Uuid;

    fn fake_face() -> FaceBox {
        FaceBox {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
            confidence: 0.8,
        }
    }

    /// Serve exactly one request with a canned response line.
    fn one_shot_service(response: &'static str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("likeness-engine-{}.sock", Uuid::new_v4()));
        let listener = UnixListener::bind(&path).unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut stream = stream;
            stream
                .write_all(format!("{response}\n").as_bytes())
                .unwrap();
        });
        path
    }

    #[test]
    fn test_locate_faces_parses_response() {
        let socket = one_shot_service(
            r#"{"status":"faces","faces":[{"x":1.0,"y":2.0,"width":3.0,"height":4.0,"confidence":0.8}]}"#,
        );
        let engine = RemoteEngine::new(socket);
        let faces = engine.locate_faces(Path::new("/tmp/a.img")).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].confidence, 0.8);
    }

    #[test]
    fn test_backend_error_is_surfaced() {
        let socket = one_shot_service(r#"{"status":"error","message":"model not loaded"}"#);
        let engine = RemoteEngine::new(socket);
        let err = engine
            .extract(Path::new("/tmp/a.img"), &fake_face())
            .unwrap_err();
        assert!(matches!(err, EngineError::Backend(m) if m == "model not loaded"));
    }

    #[test]
    fn test_missing_service_is_unavailable() {
        let engine = RemoteEngine::new(PathBuf::from("/nonexistent/engine.sock"));
        let err = engine.locate_faces(Path::new("/tmp/a.img")).unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }

    #[test]
    fn test_mismatched_response_is_protocol_error() {
        let socket = one_shot_service(r#"{"status":"embedding","embedding":null}"#);
        let engine = RemoteEngine::new(socket);
        let err = engine.locate_faces(Path::new("/tmp/a.img")).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }
}

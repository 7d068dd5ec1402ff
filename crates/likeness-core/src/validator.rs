//! Enforces the "exactly one face" precondition on a stored image.

use crate::engine::FaceEngine;
use crate::types::EmbeddingOutcome;
use std::path::Path;

/// Validate the image at `image`: it must contain exactly one detectable
/// face whose embedding can be extracted.
///
/// Multi-face images are refused rather than guessing which face to use.
/// Any engine failure is logged and mapped to `ExtractionFailed`; nothing
/// propagates raw to the caller. Storage ownership stays with the caller —
/// this never deletes the image.
pub fn validate<E: FaceEngine + ?Sized>(engine: &E, image: &Path) -> EmbeddingOutcome {
    let faces = match engine.locate_faces(image) {
        Ok(faces) => faces,
        Err(e) => {
            tracing::warn!(image = %image.display(), error = %e, "face localization failed");
            return EmbeddingOutcome::ExtractionFailed;
        }
    };

    match faces.len() {
        0 => return EmbeddingOutcome::NoFace,
        1 => {}
        n => return EmbeddingOutcome::MultipleFaces(n),
    }

    match engine.extract(image, &faces[0]) {
        Ok(Some(embedding)) => EmbeddingOutcome::Ok(embedding),
        Ok(None) => EmbeddingOutcome::ExtractionFailed,
        Err(e) => {
            tracing::warn!(image = %image.display(), error = %e, "embedding extraction failed");
            EmbeddingOutcome::ExtractionFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::types::{Embedding, FaceBox};

    enum Script {
        Faces(usize),
        LocateFails,
        ExtractNone,
        ExtractFails,
    }

    struct ScriptedEngine(Script);

    fn face() -> FaceBox {
        FaceBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            confidence: 0.9,
        }
    }

    impl FaceEngine for ScriptedEngine {
        fn locate_faces(&self, _image: &Path) -> Result<Vec<FaceBox>, EngineError> {
            match self.0 {
                Script::LocateFails => Err(EngineError::Backend("detector crashed".into())),
                Script::Faces(n) => Ok((0..n).map(|_| face()).collect()),
                _ => Ok(vec![face()]),
            }
        }

        fn extract(
            &self,
            _image: &Path,
            _face: &FaceBox,
        ) -> Result<Option<Embedding>, EngineError> {
            match self.0 {
                Script::ExtractNone => Ok(None),
                Script::ExtractFails => Err(EngineError::Backend("no vector".into())),
                _ => Ok(Some(Embedding {
                    values: vec![1.0, 0.0],
                    model_version: None,
                })),
            }
        }
    }

    #[test]
    fn test_single_face_yields_embedding() {
        let outcome = validate(&ScriptedEngine(Script::Faces(1)), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::Ok(_)));
    }

    #[test]
    fn test_zero_faces() {
        let outcome = validate(&ScriptedEngine(Script::Faces(0)), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::NoFace));
    }

    #[test]
    fn test_multiple_faces_reports_count() {
        let outcome = validate(&ScriptedEngine(Script::Faces(3)), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::MultipleFaces(3)));
    }

    #[test]
    fn test_locate_error_maps_to_extraction_failed() {
        let outcome = validate(&ScriptedEngine(Script::LocateFails), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::ExtractionFailed));
    }

    #[test]
    fn test_missing_vector_maps_to_extraction_failed() {
        let outcome = validate(&ScriptedEngine(Script::ExtractNone), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::ExtractionFailed));
    }

    #[test]
    fn test_extract_error_maps_to_extraction_failed() {
        let outcome = validate(&ScriptedEngine(Script::ExtractFails), Path::new("/tmp/x"));
        assert!(matches!(outcome, EmbeddingOutcome::ExtractionFailed));
    }
}

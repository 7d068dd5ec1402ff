use serde::{Deserialize, Serialize};

/// Location of one detected face within an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face embedding vector (128-dimensional for the reference encodings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding. The scoring thresholds
    /// are calibrated per model version; a mismatch means recalibration.
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute Euclidean distance to another embedding.
    ///
    /// Lower means more similar. Nominally lands in [0, 1] for the
    /// reference encodings but is not formally bounded.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Outcome of validating a single image: exactly one face with a usable
/// embedding, or the specific reason it was rejected.
#[derive(Debug, Clone)]
pub enum EmbeddingOutcome {
    Ok(Embedding),
    NoFace,
    MultipleFaces(usize),
    ExtractionFailed,
}

/// Discrete reliability label derived from the embedding distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// User-facing label, matching the bot's reply language.
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "Alta",
            ConfidenceTier::Medium => "Média",
            ConfidenceTier::Low => "Baixa",
        }
    }
}

/// Result of comparing two embeddings.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Raw embedding distance.
    pub distance: f32,
    /// Similarity mapped to [0, 100], clamped.
    pub similarity_percent: f32,
    pub tier: ConfidenceTier,
}

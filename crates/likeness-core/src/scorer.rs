//! Similarity scoring between two face embeddings.
//!
//! Distance thresholds are fixed policy constants calibrated against the
//! reference encoding model. A replacement model must be recalibrated
//! against them.

use crate::types::{Comparison, ConfidenceTier, Embedding};
use thiserror::Error;

/// Distances below this are reported as high confidence.
pub const HIGH_CONFIDENCE_MAX_DISTANCE: f32 = 0.4;
/// Distances below this (and at or above the high bound) are medium.
pub const MEDIUM_CONFIDENCE_MAX_DISTANCE: f32 = 0.6;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("embedding shape mismatch: {left} vs {right} dimensions")]
    ShapeMismatch { left: usize, right: usize },
    #[error("distance computation produced a non-finite value")]
    NonFiniteDistance,
}

/// Euclidean-distance scorer over raw embedding vectors.
pub struct EuclideanScorer;

impl EuclideanScorer {
    /// Compare two embeddings, deriving the similarity percentage and
    /// confidence tier from their Euclidean distance.
    ///
    /// The distance is nominally in [0, 1] but not bounded; the percentage
    /// is clamped to [0, 100] so out-of-range distances degrade to 0%
    /// rather than going negative.
    pub fn compare(&self, a: &Embedding, b: &Embedding) -> Result<Comparison, CompareError> {
        if a.values.is_empty() || a.values.len() != b.values.len() {
            return Err(CompareError::ShapeMismatch {
                left: a.values.len(),
                right: b.values.len(),
            });
        }

        let distance = a.euclidean_distance(b);
        if !distance.is_finite() {
            return Err(CompareError::NonFiniteDistance);
        }

        let similarity_percent = ((1.0 - distance) * 100.0).clamp(0.0, 100.0);

        let tier = if distance < HIGH_CONFIDENCE_MAX_DISTANCE {
            ConfidenceTier::High
        } else if distance < MEDIUM_CONFIDENCE_MAX_DISTANCE {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        };

        Ok(Comparison {
            distance,
            similarity_percent,
            tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: Vec<f32>) -> Embedding {
        Embedding {
            values,
            model_version: None,
        }
    }

    /// Embedding pair at exactly the given Euclidean distance.
    fn pair_at_distance(d: f32) -> (Embedding, Embedding) {
        (emb(vec![0.0, 0.0, 0.0]), emb(vec![d, 0.0, 0.0]))
    }

    #[test]
    fn test_identical_embeddings_full_similarity() {
        let (a, b) = pair_at_distance(0.0);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert!((cmp.similarity_percent - 100.0).abs() < 1e-6);
        assert_eq!(cmp.tier, ConfidenceTier::High);
    }

    #[test]
    fn test_tier_below_high_bound() {
        let (a, b) = pair_at_distance(0.39);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert_eq!(cmp.tier, ConfidenceTier::High);
    }

    #[test]
    fn test_tier_at_high_bound_is_medium() {
        let (a, b) = pair_at_distance(0.4);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert_eq!(cmp.tier, ConfidenceTier::Medium);
    }

    #[test]
    fn test_tier_below_medium_bound() {
        let (a, b) = pair_at_distance(0.59);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert_eq!(cmp.tier, ConfidenceTier::Medium);
    }

    #[test]
    fn test_tier_at_medium_bound_is_low() {
        let (a, b) = pair_at_distance(0.6);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert_eq!(cmp.tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_similarity_clamped_for_large_distance() {
        // Distance > 1 would map to a negative percentage without clamping.
        let (a, b) = pair_at_distance(1.5);
        let cmp = EuclideanScorer.compare(&a, &b).unwrap();
        assert_eq!(cmp.similarity_percent, 0.0);
        assert_eq!(cmp.tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_similarity_always_in_range() {
        for d in [0.0f32, 0.2, 0.5, 0.9, 1.0, 2.0, 10.0] {
            let (a, b) = pair_at_distance(d);
            let cmp = EuclideanScorer.compare(&a, &b).unwrap();
            assert!(
                (0.0..=100.0).contains(&cmp.similarity_percent),
                "distance {d} gave {}",
                cmp.similarity_percent
            );
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = emb(vec![0.0, 0.0]);
        let b = emb(vec![0.0, 0.0, 0.0]);
        assert!(matches!(
            EuclideanScorer.compare(&a, &b),
            Err(CompareError::ShapeMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_empty_embeddings_rejected() {
        let a = emb(vec![]);
        let b = emb(vec![]);
        assert!(matches!(
            EuclideanScorer.compare(&a, &b),
            Err(CompareError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_nan_distance_rejected() {
        let a = emb(vec![f32::NAN, 0.0]);
        let b = emb(vec![0.0, 0.0]);
        assert!(matches!(
            EuclideanScorer.compare(&a, &b),
            Err(CompareError::NonFiniteDistance)
        ));
    }
}

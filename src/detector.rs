//! Near-duplicate detection over a seller's stored product vectors.

use crate::error::AppResult;
use crate::models::{ProductId, StoredVector};
use crate::vector::FeatureVector;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub product_id: ProductId,
    pub image_id: i64,
    pub vector: FeatureVector,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns every stored vector within the threshold of `candidate`.
    ///
    /// `stored` must already be scoped to one owner. A vector of a different
    /// dimension fails the whole search with `DimensionMismatch`. Several
    /// images of the same product collapse into the closest one.
    pub fn find_matches(
        &self,
        candidate: &FeatureVector,
        stored: &[StoredVector],
    ) -> AppResult<Vec<Match>> {
        let mut matches: Vec<Match> = Vec::new();
        for entry in stored {
            let distance = candidate.distance(&entry.vector)?;
            if distance > self.threshold {
                continue;
            }
            match matches.iter_mut().find(|m| m.product_id == entry.product_id) {
                Some(existing) if existing.distance <= distance => {}
                Some(existing) => {
                    existing.image_id = entry.image_id;
                    existing.vector = entry.vector.clone();
                    existing.distance = distance;
                }
                None => matches.push(Match {
                    product_id: entry.product_id,
                    image_id: entry.image_id,
                    vector: entry.vector.clone(),
                    distance,
                }),
            }
        }
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(matches)
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use proptest::prelude::*;

    fn stored(product_id: ProductId, image_id: i64, components: Vec<f64>) -> StoredVector {
        StoredVector {
            product_id,
            image_id,
            vector: FeatureVector::new(components).unwrap(),
        }
    }

    #[test]
    fn identical_vector_always_matches() {
        let detector = DuplicateDetector::new(0.0);
        let v = FeatureVector::new(vec![0.3, 0.7, -0.1]).unwrap();
        let found = detector
            .find_matches(&v, &[stored(7, 70, vec![0.3, 0.7, -0.1])])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_id, 7);
        assert_eq!(found[0].distance, 0.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let detector = DuplicateDetector::new(5.0);
        let v = FeatureVector::new(vec![0.0, 0.0]).unwrap();
        let found = detector
            .find_matches(
                &v,
                &[stored(1, 10, vec![3.0, 4.0]), stored(2, 20, vec![3.0, 4.1])],
            )
            .unwrap();
        assert_eq!(
            found.iter().map(|m| m.product_id).collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[test]
    fn collapses_images_of_one_product_and_sorts_by_distance() {
        let detector = DuplicateDetector::new(1.0);
        let v = FeatureVector::new(vec![0.0]).unwrap();
        let found = detector
            .find_matches(
                &v,
                &[
                    stored(1, 10, vec![0.9]),
                    stored(2, 20, vec![0.2]),
                    stored(1, 11, vec![0.1]),
                ],
            )
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].product_id, found[0].image_id), (1, 11));
        assert_eq!(found[1].product_id, 2);
    }

    #[test]
    fn mismatched_dimension_fails_instead_of_truncating() {
        let detector = DuplicateDetector::default();
        let v = FeatureVector::new(vec![0.0, 0.0]).unwrap();
        let err = detector
            .find_matches(&v, &[stored(1, 10, vec![0.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));
    }

    proptest! {
        #[test]
        fn far_vectors_never_match(
            base in prop::collection::vec(-10.0f64..10.0, 1..64),
            threshold in 0.01f64..2.0,
            slack in 0.001f64..1.0,
        ) {
            let dim = base.len() as f64;
            let offset = threshold / dim.sqrt() + slack;
            let shifted: Vec<f64> = base.iter().map(|c| c + offset).collect();
            let detector = DuplicateDetector::new(threshold);
            let candidate = FeatureVector::new(base).unwrap();
            let found = detector.find_matches(&candidate, &[stored(1, 1, shifted)]).unwrap();
            prop_assert!(found.is_empty());
        }
    }
}

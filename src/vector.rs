//! Feature vectors produced by the recognizer for product photos.
//!
//! Vectors are stored as text: components are written with Rust's shortest
//! round-trip float formatting and joined with commas, so decoding yields
//! bit-identical components.

use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

const SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Builds a vector, rejecting empty input and non-finite components.
    pub fn new(components: Vec<f64>) -> AppResult<Self> {
        if components.is_empty() {
            return Err(AppError::Validation("feature vector is empty".into()));
        }
        if let Some(index) = components.iter().position(|c| !c.is_finite()) {
            return Err(AppError::Validation(format!(
                "feature vector component {index} is not finite"
            )));
        }
        Ok(Self(components))
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn components(&self) -> &[f64] {
        &self.0
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(encoded: &str) -> AppResult<Self> {
        encoded.parse()
    }

    /// Euclidean distance. Vectors of different dimension cannot be compared.
    pub fn distance(&self, other: &FeatureVector) -> AppResult<f64> {
        if self.dimension() != other.dimension() {
            return Err(AppError::DimensionMismatch {
                left: self.dimension(),
                right: other.dimension(),
            });
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum();
        Ok(sum.sqrt())
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl FromStr for FeatureVector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split(SEPARATOR)
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    AppError::Validation(format!("invalid feature vector component '{part}'"))
                })
            })
            .collect::<AppResult<Vec<f64>>>()?;
        Self::new(components)
    }
}

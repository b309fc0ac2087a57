//! Vector similarity.

use crate::{HuginnError, Result};

/// Cosine similarity: dot product over the product of norms.
///
/// Accumulates in f64 and clamps to `[-1.0, 1.0]` so rounding never pushes
/// an identical pair above 1. A zero-norm vector has similarity 0.0 with
/// everything. Vectors of different lengths are an error, not a miss; the
/// cache decides how to degrade.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(HuginnError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        Ok((dot / denom).clamp(-1.0, 1.0) as f32)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors() {
        let v = [0.3, 0.4, 0.5];
        assert_eq!(cosine_similarity(&v, &v).unwrap(), 1.0);
    }

    #[test]
    fn opposite_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap(), -1.0);
    }

    #[test]
    fn orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn exact_ratio() {
        // |b| = sqrt(289 + 100 + 9 + 1 + 1) = 20
        let a = [1.0, 0.0, 0.0, 0.0, 0.0];
        let b = [17.0, 10.0, 3.0, 1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.85);
    }

    #[test]
    fn zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch() {
        let err = cosine_similarity(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            HuginnError::DimensionMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }
}

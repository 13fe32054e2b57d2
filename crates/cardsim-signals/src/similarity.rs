//! Scalar similarity primitives shared by the providers.

use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};

/// Generic Jaccard similarity: `|A ∩ B| / |A ∪ B|`.
///
/// Returns `0.0` if both sets are empty (to avoid 0/0).
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use cardsim_signals::jaccard;
///
/// let a: HashSet<&str> = ["x", "y", "z"].into_iter().collect();
/// let b: HashSet<&str> = ["y", "z", "w"].into_iter().collect();
/// let sim = jaccard(&a, &b);
/// // intersection = {"y","z"} (2), union = {"x","y","z","w"} (4)
/// assert!((sim - 0.5).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard<T: Eq + Hash, S: BuildHasher>(a: &HashSet<T, S>, b: &HashSet<T, S>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    // |A ∪ B| = |A| + |B| - |A ∩ B|
    let intersection = a.iter().filter(|x| b.contains(*x)).count();
    let union_size = a.len() + b.len() - intersection;
    if union_size == 0 {
        0.0
    } else {
        intersection as f64 / union_size as f64
    }
}

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// `None` for mismatched lengths, empty input, or a zero vector.
#[must_use]
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Option<f64> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut left_norm_sq = 0.0_f64;
    let mut right_norm_sq = 0.0_f64;

    for (a, b) in left.iter().zip(right.iter()) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm_sq += a * a;
        right_norm_sq += b * b;
    }

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }

    Some((dot / denom).clamp(-1.0, 1.0))
}

/// Map a cosine in `[-1, 1]` onto `[0, 1]`.
#[must_use]
pub fn cosine_to_unit(cosine: f64) -> f64 {
    ((cosine + 1.0) * 0.5).clamp(0.0, 1.0)
}

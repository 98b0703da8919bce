//! Shared vector-arithmetic helpers used across the embedding, storage,
//! search, and temporal-embedding modules.

/// Cosine similarity of two equal-length vectors. Returns `0.0` for a
/// zero-length or mismatched-length input rather than panicking or
/// dividing by zero, since fail-soft zero vectors are a first-class
/// possibility per §4.2.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// `1 - cosine_similarity`, the distance HNSW indices are built over.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// L2 norm (Euclidean length) of a vector.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2-normalise a vector in place. A zero vector is left unchanged (there
/// is nothing to normalise toward, and zero vectors are a recognised
/// fail-soft sentinel per §4.2).
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Whether a vector is (approximately) L2-unit, per invariant P3. Zero
/// vectors are explicitly excepted.
#[must_use]
pub fn is_unit_or_zero(v: &[f32]) -> bool {
    let norm = l2_norm(v);
    norm == 0.0 || (norm - 1.0).abs() < 1e-4
}

/// Weighted mean of a set of equal-length vectors. Returns `None` if the
/// input is empty or the weights sum to (approximately) zero.
#[must_use]
pub fn weighted_mean(vectors: &[(Vec<f32>, f32)]) -> Option<Vec<f32>> {
    let dim = vectors.first()?.0.len();
    let mut acc = vec![0.0f32; dim];
    let mut weight_sum = 0.0f32;
    for (v, w) in vectors {
        if v.len() != dim {
            continue;
        }
        for (a, x) in acc.iter_mut().zip(v.iter()) {
            *a += x * w;
        }
        weight_sum += w;
    }
    if weight_sum.abs() < 1e-9 {
        return None;
    }
    for a in &mut acc {
        *a /= weight_sum;
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_zero_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_similarity_is_zero_not_nan() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!(is_unit_or_zero(&v));
    }

    #[test]
    fn normalize_leaves_zero_vector_as_zero() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
        assert!(is_unit_or_zero(&v));
    }

    #[test]
    fn weighted_mean_respects_weights() {
        let vectors = vec![(vec![1.0, 0.0], 1.0), (vec![0.0, 1.0], 3.0)];
        let mean = weighted_mean(&vectors).unwrap();
        assert!((mean[0] - 0.25).abs() < 1e-6);
        assert!((mean[1] - 0.75).abs() < 1e-6);
    }
}

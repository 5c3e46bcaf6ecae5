use crate::utils::error::PipelineError;

/// Cosine of the angle between two embeddings, in `[-1.0, 1.0]`.
///
/// Mismatched or empty vectors are an embedding error. A zero-magnitude
/// vector has no direction and scores `0.0` against anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, PipelineError> {
    if a.is_empty() || b.is_empty() {
        return Err(PipelineError::Embedding("empty embedding vector".to_string()));
    }
    if a.len() != b.len() {
        return Err(PipelineError::Embedding(format!(
            "embedding dimensions differ ({} vs {})",
            a.len(),
            b.len()
        )));
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }

    // Rounding can push the ratio slightly outside the valid range
    Ok((dot / denominator).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-6, "{} != {}", actual, expected);
    }

    #[test]
    fn scale_does_not_change_the_score() {
        approx(cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0);
        approx(cosine_similarity(&[3.0, 0.0], &[-0.5, 0.0]).unwrap(), -1.0);
    }

    #[test]
    fn unrelated_directions_score_zero() {
        approx(cosine_similarity(&[0.0, 5.0], &[7.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn known_angle() {
        // 60 degrees apart
        approx(cosine_similarity(&[1.0, 0.0], &[0.5, 0.75_f32.sqrt()]).unwrap(), 0.5);
    }

    #[test]
    fn zero_magnitude_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0; 4], &[0.1, 0.2, 0.3, 0.4]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0; 2], &[0.0; 2]).unwrap(), 0.0);
    }

    #[test]
    fn bad_shapes_are_embedding_errors() {
        assert!(matches!(
            cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(PipelineError::Embedding(_))
        ));
        assert!(matches!(
            cosine_similarity(&[], &[]),
            Err(PipelineError::Embedding(_))
        ));
    }
}

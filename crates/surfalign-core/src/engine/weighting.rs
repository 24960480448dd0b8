use super::config::WeightingMethod;
use tracing::warn;

/// Per-pair weights for one solver step, normalized to sum to one.
///
/// `feature_sq` holds the squared normalized feature distance of each template
/// point to its current match; `None` entries (unmatched points) get weight zero.
pub fn compute_weights(method: &WeightingMethod, feature_sq: &[Option<f64>]) -> Vec<f64> {
    let raw: Vec<f64> = match method {
        WeightingMethod::None => feature_sq
            .iter()
            .map(|f| if f.is_some() { 1.0 } else { 0.0 })
            .collect(),
        WeightingMethod::FeaturesSigmoid { midpoint, slope } => feature_sq
            .iter()
            .map(|f| match f {
                Some(f) => sigmoid(slope * (midpoint - f.max(0.0).sqrt())),
                None => 0.0,
            })
            .collect(),
    };
    normalize(raw, feature_sq)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn normalize(mut weights: Vec<f64>, feature_sq: &[Option<f64>]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter_mut().for_each(|w| *w /= total);
        return weights;
    }

    let matched = feature_sq.iter().filter(|f| f.is_some()).count();
    if matched == 0 {
        return vec![0.0; weights.len()];
    }
    warn!(
        total,
        matched, "Pair weights vanished; falling back to uniform weighting"
    );
    let uniform = 1.0 / matched as f64;
    feature_sq
        .iter()
        .map(|f| if f.is_some() { uniform } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(w: &[f64]) -> f64 {
        w.iter().sum()
    }

    #[test]
    fn none_weighting_is_uniform() {
        let w = compute_weights(
            &WeightingMethod::None,
            &[Some(4.0), Some(0.0), Some(9.0), Some(1.0)],
        );
        assert_eq!(w, vec![0.25; 4]);
    }

    #[test]
    fn unmatched_points_get_zero_weight() {
        let w = compute_weights(&WeightingMethod::None, &[Some(1.0), None]);
        assert_eq!(w, vec![1.0, 0.0]);
    }

    #[test]
    fn sigmoid_prefers_chemically_closer_pairs() {
        let method = WeightingMethod::FeaturesSigmoid {
            midpoint: 1.0,
            slope: 5.0,
        };
        let w = compute_weights(&method, &[Some(0.0), Some(1.0), Some(4.0)]);
        assert!((sum(&w) - 1.0).abs() < 1e-12);
        assert!(w[0] > w[1] && w[1] > w[2]);
        // At the midpoint the raw weight is exactly one half.
        let raw_mid = sigmoid(0.0);
        assert!((raw_mid - 0.5).abs() < 1e-15);
    }

    #[test]
    fn underflowing_sigmoid_falls_back_to_uniform() {
        let method = WeightingMethod::FeaturesSigmoid {
            midpoint: 0.0,
            slope: 1e6,
        };
        let w = compute_weights(&method, &[Some(100.0), Some(400.0), None]);
        assert_eq!(w, vec![0.5, 0.5, 0.0]);
    }
}

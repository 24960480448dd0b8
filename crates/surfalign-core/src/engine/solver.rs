//! Closed-form weighted rotation estimation.
//!
//! For centered point pairs `(a_i, b_i)` the rotation minimizing
//! `Σ w_i ‖b_i − R·a_i‖²` is the unit quaternion `q` minimizing `qᵀ B q`, where
//! `B = Σ w_i A_iᵀ A_i` and `A_i` is the 4×4 matrix with `A_i q = b_i q − q a_i`.
//! The minimizer is the eigenvector of the smallest eigenvalue of `B`, and that
//! eigenvalue is the residual.

use crate::core::utils::geometry::{rotation_from_axis_angle, weighted_centroid};
use nalgebra::{Matrix3, Matrix4, Point3, SymmetricEigen, Vector3};
use thiserror::Error;

/// Below this `sin(θ/2)` the rotation is reported as the identity.
const SMALL_ANGLE_EPSILON: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("Point sets differ in length: {source_len} source, {target_len} target, {weights} weights")]
    LengthMismatch {
        source_len: usize,
        target_len: usize,
        weights: usize,
    },
    #[error("No point pairs to align")]
    Empty,
    #[error("Weights sum to {0}, expected a positive finite total")]
    DegenerateWeights(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationEstimate {
    pub rotation: Matrix3<f64>,
    pub angle_degrees: f64,
    /// `None` when the rotation is (numerically) the identity.
    pub axis: Option<Vector3<f64>>,
    pub residual: f64,
}

/// Incremental rigid motion carrying `moving` onto `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Increment {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub angle_degrees: f64,
    pub residual: f64,
}

fn pair_matrix(source: &Vector3<f64>, target: &Vector3<f64>) -> Matrix4<f64> {
    let d = target - source;
    let s = source + target;
    #[rustfmt::skip]
    let m = Matrix4::new(
        0.0, -d.x, -d.y, -d.z,
        d.x,  0.0, -s.z,  s.y,
        d.y,  s.z,  0.0, -s.x,
        d.z, -s.y,  s.x,  0.0,
    );
    m
}

fn check_lengths(source: usize, target: usize, weights: usize) -> Result<(), SolverError> {
    if source != target || source != weights {
        return Err(SolverError::LengthMismatch {
            source_len: source,
            target_len: target,
            weights,
        });
    }
    if source == 0 {
        return Err(SolverError::Empty);
    }
    Ok(())
}

/// Weighted least-squares rotation between two already centered point sets.
pub fn solve_weighted_rotation(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
    weights: &[f64],
) -> Result<RotationEstimate, SolverError> {
    check_lengths(source.len(), target.len(), weights.len())?;

    let b = source
        .iter()
        .zip(target)
        .zip(weights)
        .fold(Matrix4::zeros(), |acc, ((a, t), &w)| {
            let m = pair_matrix(a, t);
            acc + m.transpose() * m * w
        });

    let eigen = SymmetricEigen::new(b);
    let (min_index, min_value) = eigen
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, v)| if v < best.1 { (i, v) } else { best });

    let q = eigen.eigenvectors.column(min_index);
    let (mut w, mut v) = (q[0], Vector3::new(q[1], q[2], q[3]));
    if w < 0.0 {
        w = -w;
        v = -v;
    }

    let residual = min_value.max(0.0);
    let sin_half = v.norm();
    if sin_half < SMALL_ANGLE_EPSILON {
        return Ok(RotationEstimate {
            rotation: Matrix3::identity(),
            angle_degrees: 0.0,
            axis: None,
            residual,
        });
    }

    let axis = v / sin_half;
    let angle_degrees = (2.0 * sin_half.atan2(w)).to_degrees();
    Ok(RotationEstimate {
        rotation: rotation_from_axis_angle(&axis, angle_degrees),
        angle_degrees,
        axis: Some(axis),
        residual,
    })
}

/// Centers both sets on their weighted centroids, solves for the rotation, and
/// derives the translation `t = c_target − R·c_moving`.
pub fn estimate_increment(
    moving: &[Point3<f64>],
    target: &[Point3<f64>],
    weights: &[f64],
) -> Result<Increment, SolverError> {
    check_lengths(moving.len(), target.len(), weights.len())?;

    let total: f64 = weights.iter().sum();
    let (Some(c_moving), Some(c_target)) = (
        weighted_centroid(moving, weights),
        weighted_centroid(target, weights),
    ) else {
        return Err(SolverError::DegenerateWeights(total));
    };

    let centered_moving: Vec<Vector3<f64>> = moving.iter().map(|p| p - c_moving).collect();
    let centered_target: Vec<Vector3<f64>> = target.iter().map(|p| p - c_target).collect();
    let estimate = solve_weighted_rotation(&centered_moving, &centered_target, weights)?;

    Ok(Increment {
        translation: c_target.coords - estimate.rotation * c_moving.coords,
        rotation: estimate.rotation,
        angle_degrees: estimate.angle_degrees,
        residual: estimate.residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::{is_orthonormal, rotation_angle_degrees};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(rng: &mut StdRng, n: usize) -> Vec<Point3<f64>> {
        (0..n)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                )
            })
            .collect()
    }

    #[test]
    fn recovers_known_rotation_with_zero_residual() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = random_points(&mut rng, 20);
        let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / 20.0;
        let source: Vec<Vector3<f64>> = points.iter().map(|p| p.coords - centroid).collect();

        let axis = Vector3::new(1.0, 2.0, -0.5).normalize();
        let truth = rotation_from_axis_angle(&axis, 37.0);
        let target: Vec<Vector3<f64>> = source.iter().map(|a| truth * a).collect();
        let weights = vec![1.0 / 20.0; 20];

        let estimate = solve_weighted_rotation(&source, &target, &weights).unwrap();
        assert!((estimate.rotation - truth).norm() < 1e-9);
        assert!((estimate.angle_degrees - 37.0).abs() < 1e-7);
        assert!((estimate.axis.unwrap() - axis).norm() < 1e-9);
        assert!(estimate.residual < 1e-9);
        assert!(is_orthonormal(&estimate.rotation, 1e-12));
    }

    #[test]
    fn quarter_turn_about_z() {
        let source = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, -2.0, 0.0),
        ];
        let target: Vec<_> = source
            .iter()
            .map(|a| Vector3::new(-a.y, a.x, a.z))
            .collect();
        let estimate = solve_weighted_rotation(&source, &target, &[0.25; 4]).unwrap();
        assert!((estimate.angle_degrees - 90.0).abs() < 1e-9);
        assert!((estimate.axis.unwrap() - Vector3::z()).norm() < 1e-9);
    }

    #[test]
    fn residual_equals_weighted_squared_misfit() {
        let source = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.5),
        ];
        let target = vec![
            Vector3::new(0.9, 0.2, 0.0),
            Vector3::new(-1.1, -0.1, 0.1),
            Vector3::new(0.1, 1.0, -0.2),
            Vector3::new(0.0, -1.0, 0.4),
        ];
        let weights = [0.4, 0.3, 0.2, 0.1];
        let estimate = solve_weighted_rotation(&source, &target, &weights).unwrap();
        let misfit: f64 = source
            .iter()
            .zip(&target)
            .zip(&weights)
            .map(|((a, b), w)| w * (b - estimate.rotation * a).norm_squared())
            .sum();
        assert!((estimate.residual - misfit).abs() < 1e-9);
    }

    #[test]
    fn identical_sets_give_identity() {
        let source = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, -1.0, 0.0),
        ];
        let estimate = solve_weighted_rotation(&source, &source, &[1.0; 3]).unwrap();
        assert!((estimate.rotation - Matrix3::identity()).norm() < 1e-9);
        assert!(estimate.angle_degrees.abs() < 1e-6);
    }

    #[test]
    fn increment_recovers_rigid_motion() {
        let mut rng = StdRng::seed_from_u64(11);
        let moving = random_points(&mut rng, 12);
        let rotation = rotation_from_axis_angle(&Vector3::new(0.0, 1.0, 1.0).normalize(), -25.0);
        let translation = Vector3::new(3.0, -1.5, 0.25);
        let target: Vec<_> = moving.iter().map(|p| rotation * p + translation).collect();
        let weights: Vec<f64> = (1..=12).map(|i| i as f64).collect();

        let inc = estimate_increment(&moving, &target, &weights).unwrap();
        assert!((inc.rotation - rotation).norm() < 1e-9);
        assert!((inc.translation - translation).norm() < 1e-9);
        assert!((rotation_angle_degrees(&inc.rotation) - 25.0).abs() < 1e-7);
        assert!((inc.angle_degrees - 25.0).abs() < 1e-7);
    }

    #[test]
    fn rejects_mismatched_or_degenerate_input() {
        let one = [Point3::origin()];
        let two = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            estimate_increment(&one, &two, &[1.0]),
            Err(SolverError::LengthMismatch { .. })
        ));
        assert_eq!(estimate_increment(&[], &[], &[]), Err(SolverError::Empty));
        assert!(matches!(
            estimate_increment(&two, &two, &[0.0, 0.0]),
            Err(SolverError::DegenerateWeights(_))
        ));
    }
}

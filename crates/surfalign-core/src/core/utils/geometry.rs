use nalgebra::{Matrix3, Point3, Vector3};

/// Pitch magnitude (degrees) at and beyond which Euler extraction falls back to
/// the gimbal-lock branch.
pub const GIMBAL_LOCK_THRESHOLD_DEGREES: f64 = 89.9;

const AXIS_ANGLE_EPSILON: f64 = 1e-12;

/// Euler angles in degrees, applied as `Rz(rz) · Ry(ry) · Rx(rx)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl EulerAngles {
    pub const fn new(rx: f64, ry: f64, rz: f64) -> Self {
        Self { rx, ry, rz }
    }
}

impl From<[f64; 3]> for EulerAngles {
    fn from(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

/// Extracts Euler angles from a rotation matrix.
///
/// Near ±90° pitch the roll and yaw are not separable; `rz` is then fixed at
/// zero and the combined rotation is folded into `rx`. Angle triples may jump
/// across that boundary even though the rebuilt matrix is continuous.
pub fn angles_from_rotation_matrix(r: &Matrix3<f64>) -> EulerAngles {
    let ry = (-r[(2, 0)]).clamp(-1.0, 1.0).asin().to_degrees();
    if ry.abs() < GIMBAL_LOCK_THRESHOLD_DEGREES {
        EulerAngles {
            rx: r[(2, 1)].atan2(r[(2, 2)]).to_degrees(),
            ry,
            rz: r[(1, 0)].atan2(r[(0, 0)]).to_degrees(),
        }
    } else {
        EulerAngles {
            rx: (-r[(1, 2)]).atan2(r[(1, 1)]).to_degrees(),
            ry,
            rz: 0.0,
        }
    }
}

pub fn rotation_matrix_from_angles(angles: &EulerAngles) -> Matrix3<f64> {
    let (sx, cx) = angles.rx.to_radians().sin_cos();
    let (sy, cy) = angles.ry.to_radians().sin_cos();
    let (sz, cz) = angles.rz.to_radians().sin_cos();

    Matrix3::new(
        cy * cz,
        sx * sy * cz - cx * sz,
        cx * sy * cz + sx * sz,
        cy * sz,
        sx * sy * sz + cx * cz,
        cx * sy * sz - sx * cz,
        -sy,
        sx * cy,
        cx * cy,
    )
}

/// Rodrigues' formula. `axis` is expected to be unit length; this is not checked
/// and a non-unit axis yields a non-orthonormal matrix.
pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Matrix3<f64> {
    let (s, c) = angle_degrees.to_radians().sin_cos();
    let k = axis.cross_matrix();
    Matrix3::identity() + k * s + k * k * (1.0 - c)
}

/// Rotation angle of `r` in degrees, in `[0, 180]`.
pub fn rotation_angle_degrees(r: &Matrix3<f64>) -> f64 {
    ((r.trace() - 1.0) / 2.0).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Rebuilds `r` from its own Euler angles, discarding accumulated drift.
pub fn orthonormalize(r: &Matrix3<f64>) -> Matrix3<f64> {
    rotation_matrix_from_angles(&angles_from_rotation_matrix(r))
}

pub fn is_orthonormal(r: &Matrix3<f64>, tolerance: f64) -> bool {
    (r.transpose() * r - Matrix3::identity()).norm() <= tolerance
}

/// Applies `p ↦ R·p + t` to every point.
pub fn apply_geom_transformation(
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
    points: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    points.iter().map(|p| rotation * p + translation).collect()
}

/// In-place variant of [`apply_geom_transformation`] writing into a distinct buffer.
pub fn apply_geom_transformation_into(
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
    points: &[Point3<f64>],
    out: &mut [Point3<f64>],
) {
    assert_eq!(
        points.len(),
        out.len(),
        "output buffer must match the input point count"
    );
    for (dst, src) in out.iter_mut().zip(points) {
        *dst = rotation * src + translation;
    }
}

pub fn weighted_centroid(points: &[Point3<f64>], weights: &[f64]) -> Option<Point3<f64>> {
    if points.is_empty() || points.len() != weights.len() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let sum = points
        .iter()
        .zip(weights)
        .fold(Vector3::zeros(), |acc, (p, &w)| acc + p.coords * w);
    Some(Point3::from(sum / total))
}

/// Unit axis and angle (degrees) of a rotation.
///
/// Returns `None` when the antisymmetric part vanishes (angle ~0° or ~180°).
pub fn axis_angle_from_rotation(r: &Matrix3<f64>) -> Option<(Vector3<f64>, f64)> {
    let angle = rotation_angle_degrees(r);
    let axis = Vector3::new(
        r[(2, 1)] - r[(1, 2)],
        r[(0, 2)] - r[(2, 0)],
        r[(1, 0)] - r[(0, 1)],
    );
    let norm = axis.norm();
    if norm < AXIS_ANGLE_EPSILON {
        return None;
    }
    Some((axis / norm, angle))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn matrices_close(a: &Matrix3<f64>, b: &Matrix3<f64>, tol: f64) -> bool {
        (a - b).norm() < tol
    }

    #[test]
    fn identity_angles_give_identity_matrix() {
        let r = rotation_matrix_from_angles(&EulerAngles::default());
        assert!(matrices_close(&r, &Matrix3::identity(), 1e-15));
    }

    #[test]
    fn elemental_rotation_about_z_matches_expected_matrix() {
        let r = rotation_matrix_from_angles(&EulerAngles::new(0.0, 0.0, 90.0));
        let rotated = r * Vector3::x();
        assert!((rotated - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn angles_round_trip_outside_gimbal_lock() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let angles = EulerAngles::new(
                rng.gen_range(-180.0..180.0),
                rng.gen_range(-89.0..89.0),
                rng.gen_range(-180.0..180.0),
            );
            let r = rotation_matrix_from_angles(&angles);
            let rebuilt = rotation_matrix_from_angles(&angles_from_rotation_matrix(&r));
            assert!(matrices_close(&r, &rebuilt, 1e-9), "angles {:?}", angles);
        }
    }

    #[test]
    fn gimbal_lock_branch_still_rebuilds_matrix() {
        for &pitch in &[90.0, -90.0] {
            let angles = EulerAngles::new(30.0, pitch, 20.0);
            let r = rotation_matrix_from_angles(&angles);
            let extracted = angles_from_rotation_matrix(&r);
            assert_eq!(extracted.rz, 0.0);
            let rebuilt = rotation_matrix_from_angles(&extracted);
            assert!(matrices_close(&r, &rebuilt, 1e-9));
        }
    }

    #[test]
    fn axis_angle_matches_euler_construction() {
        let r_axis = rotation_from_axis_angle(&Vector3::z(), 35.0);
        let r_euler = rotation_matrix_from_angles(&EulerAngles::new(0.0, 0.0, 35.0));
        assert!(matrices_close(&r_axis, &r_euler, 1e-12));
        assert!(is_orthonormal(&r_axis, 1e-12));
    }

    #[test]
    fn non_unit_axis_is_not_orthonormal() {
        let r = rotation_from_axis_angle(&Vector3::new(0.0, 0.0, 2.0), 60.0);
        assert!(!is_orthonormal(&r, 1e-6));
    }

    #[test]
    fn axis_angle_extraction_inverts_rodrigues() {
        let axis = Vector3::new(1.0, 2.0, -1.0).normalize();
        let r = rotation_from_axis_angle(&axis, 48.0);
        let (found_axis, found_angle) = axis_angle_from_rotation(&r).unwrap();
        assert!((found_axis - axis).norm() < 1e-9);
        assert!((found_angle - 48.0).abs() < 1e-9);
        assert!(axis_angle_from_rotation(&Matrix3::identity()).is_none());
    }

    #[test]
    fn transformation_applies_rotation_then_translation() {
        let r = rotation_matrix_from_angles(&EulerAngles::new(0.0, 0.0, 90.0));
        let t = Vector3::new(1.0, 0.0, 0.0);
        let out = apply_geom_transformation(&r, &t, &[Point3::new(1.0, 0.0, 0.0)]);
        assert!((out[0] - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);

        let mut buffer = vec![Point3::origin(); 1];
        apply_geom_transformation_into(&r, &t, &[Point3::new(1.0, 0.0, 0.0)], &mut buffer);
        assert_eq!(buffer, out);
    }

    #[test]
    fn uniform_weighted_centroid_is_arithmetic_mean() {
        let points = vec![
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-4.0, 0.5, 2.0),
            Point3::new(0.0, 0.0, 7.0),
            Point3::new(3.0, -1.5, 0.0),
        ];
        let weights = vec![0.25; points.len()];
        let centroid = weighted_centroid(&points, &weights).unwrap();
        let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / 4.0;
        assert!((centroid.coords - mean).norm() < 1e-12);
    }

    #[test]
    fn weighted_centroid_rejects_degenerate_input() {
        assert!(weighted_centroid(&[], &[]).is_none());
        assert!(weighted_centroid(&[Point3::origin()], &[0.0]).is_none());
        assert!(weighted_centroid(&[Point3::origin()], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn rmsd_of_shifted_points() {
        let a = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let b = vec![Point3::new(0.0, 2.0, 0.0), Point3::new(1.0, 2.0, 0.0)];
        assert!((calculate_rmsd(&a, &b).unwrap() - 2.0).abs() < 1e-12);
        assert!(calculate_rmsd(&a, &b[..1]).is_none());
    }
}

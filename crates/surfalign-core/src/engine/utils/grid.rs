use crate::core::utils::geometry::EulerAngles;
use crate::engine::config::InitialRotations;
use itertools::iproduct;

pub const RX_SWEEP_DEGREES: f64 = 360.0;
pub const RY_SWEEP_DEGREES: f64 = 360.0;
pub const RZ_SWEEP_DEGREES: f64 = 180.0;

/// Tolerance when deciding whether the last step still lies inside the sweep.
const SWEEP_EPSILON: f64 = 1e-9;

/// `0, step, 2·step, …` strictly below `limit`.
pub fn angle_steps(limit: f64, step: f64) -> Vec<f64> {
    (0u64..)
        .map(|k| k as f64 * step)
        .take_while(|angle| *angle < limit - SWEEP_EPSILON)
        .collect()
}

/// Starting orientations in the order they are tried.
///
/// The grid is nested with `rx` outermost and `rz` innermost.
pub fn candidate_rotations(initial: &InitialRotations) -> Vec<EulerAngles> {
    match initial {
        InitialRotations::List(angles) => angles.clone(),
        InitialRotations::Grid { step_degrees } => {
            let rx = angle_steps(RX_SWEEP_DEGREES, *step_degrees);
            let ry = angle_steps(RY_SWEEP_DEGREES, *step_degrees);
            let rz = angle_steps(RZ_SWEEP_DEGREES, *step_degrees);
            iproduct!(rx, ry, rz)
                .map(|(x, y, z)| EulerAngles::new(x, y, z))
                .collect()
        }
    }
}

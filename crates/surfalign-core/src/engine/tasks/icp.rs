use super::matching::{FeatureDistances, MatchOutcome, Matcher};
use crate::core::models::molecule::Molecule;
use crate::core::models::template::MoleculeTemplate;
use crate::core::utils::geometry::{EulerAngles, apply_geom_transformation_into, orthonormalize};
use crate::engine::config::{AlignmentConfig, ConvergenceConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::solver;
use crate::engine::state::{
    Alignment, AlignmentOutcome, CandidateReduction, RigidTransform, StopReason,
};
use crate::engine::utils::grid;
use crate::engine::weighting::compute_weights;
use nalgebra::Point3;
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum number of template points for a well-posed rotation estimate.
pub const MIN_TEMPLATE_POINTS: usize = 3;

/// Multi-start rigid alignment of a template onto a molecule surface, matching
/// on combined geometric and chemical distance.
pub struct ChemicalIcp<'a> {
    template: &'a MoleculeTemplate,
    molecule: &'a Molecule,
    config: &'a AlignmentConfig,
    feature_distances: FeatureDistances,
}

impl<'a> ChemicalIcp<'a> {
    pub fn new(
        template: &'a MoleculeTemplate,
        molecule: &'a Molecule,
        config: &'a AlignmentConfig,
    ) -> Result<Self, EngineError> {
        if template.len() < MIN_TEMPLATE_POINTS {
            return Err(EngineError::TemplateTooSmall {
                name: template.name.clone(),
                points: template.len(),
                minimum: MIN_TEMPLATE_POINTS,
            });
        }
        if molecule.is_empty() {
            return Err(EngineError::EmptyMolecule {
                name: molecule.name.clone(),
            });
        }
        if template.geom_dev().len() != template.len() {
            return Err(EngineError::SizeMismatch {
                context: "template geometric deviations",
                expected: template.len(),
                found: template.geom_dev().len(),
            });
        }

        let feature_distances = FeatureDistances::compute(template, molecule)?;
        debug!(
            template_points = template.len(),
            molecule_points = molecule.len(),
            features = template.cloud().num_features(),
            "Precomputed feature distances."
        );

        Ok(Self {
            template,
            molecule,
            config,
            feature_distances,
        })
    }

    pub fn feature_distances(&self) -> &FeatureDistances {
        &self.feature_distances
    }

    #[instrument(
        skip_all,
        name = "chemical_icp",
        fields(template = %self.template.name, molecule = %self.molecule.name)
    )]
    pub fn run(&self, reporter: &ProgressReporter) -> Result<AlignmentOutcome, EngineError> {
        let candidates = grid::candidate_rotations(&self.config.initial_rotations);
        info!(
            candidates = candidates.len(),
            matching = %self.config.matching,
            weighting = %self.config.weighting,
            "Starting multi-start alignment."
        );

        let matcher = Matcher::new(
            self.config.matching,
            self.molecule.positions(),
            &self.feature_distances,
            self.template.geom_dev(),
        );

        reporter.report(Progress::TaskStart {
            total_steps: candidates.len() as u64,
        });

        let align_one = |(index, angles): (usize, &EulerAngles)| {
            let result = self.align_from(index, angles, &matcher);
            if let Ok(alignment) = &result {
                reporter.report(Progress::CandidateFinished {
                    index,
                    error: alignment.error,
                });
            }
            reporter.report(Progress::TaskIncrement);
            result
        };

        let keep = |acc: CandidateReduction, result: Result<Alignment, EngineError>| {
            result.map(|alignment| acc.push(alignment))
        };

        #[cfg(feature = "parallel")]
        let reduction = candidates
            .par_iter()
            .enumerate()
            .map(align_one)
            .try_fold(CandidateReduction::default, keep)
            .try_reduce(CandidateReduction::default, |a, b| Ok(a.merge(b)))?;
        #[cfg(not(feature = "parallel"))]
        let reduction = candidates
            .iter()
            .enumerate()
            .map(align_one)
            .try_fold(CandidateReduction::default(), keep)?;

        reporter.report(Progress::TaskFinish);

        let outcome: AlignmentOutcome = reduction
            .finish()
            .ok_or_else(|| EngineError::Internal("no candidate rotations to try".to_string()))?;
        info!(
            candidate = outcome.best.candidate,
            error = outcome.best.error,
            iterations = outcome.best.iterations,
            "Best candidate selected."
        );
        Ok(outcome)
    }

    /// Runs the ICP loop from a single starting orientation.
    pub fn align_from(
        &self,
        candidate: usize,
        initial_angles: &EulerAngles,
        matcher: &Matcher,
    ) -> Result<Alignment, EngineError> {
        let template_points = self.template.positions();
        let molecule_points = self.molecule.positions();
        let mut transform = RigidTransform::from_angles(initial_angles);
        let mut transformed = vec![Point3::origin(); template_points.len()];
        let mut iterations = 0;

        loop {
            apply_geom_transformation_into(
                &transform.rotation,
                &transform.translation,
                template_points,
                &mut transformed,
            );
            let matches = matcher.find_matches(&transformed);
            let weights = compute_weights(&self.config.weighting, &matches.feature_sq);

            let (moving, target, pair_weights) =
                matched_pairs(&transformed, molecule_points, &matches, &weights);
            if moving.len() < MIN_TEMPLATE_POINTS {
                return Err(EngineError::Internal(format!(
                    "only {} template points could be matched",
                    moving.len()
                )));
            }
            let increment = solver::estimate_increment(&moving, &target, &pair_weights)?;

            let delta = RigidTransform {
                rotation: increment.rotation,
                translation: increment.translation,
            };
            let composed = transform.then(&delta);
            transform = RigidTransform {
                rotation: orthonormalize(&composed.rotation),
                translation: composed.translation,
            };
            iterations += 1;

            apply_geom_transformation_into(
                &transform.rotation,
                &transform.translation,
                template_points,
                &mut transformed,
            );
            let (error, geometric_sq) =
                self.weighted_error(&transformed, &matches, &weights, matcher);
            let translation_step = increment.translation.norm();
            trace!(
                candidate,
                iterations,
                error,
                angle = increment.angle_degrees,
                translation = translation_step,
                "ICP iteration."
            );

            if let Some(stop_reason) = check_convergence(
                &self.config.convergence,
                self.config.max_iterations,
                iterations,
                error,
                increment.angle_degrees,
                translation_step,
            ) {
                debug!(candidate, iterations, error, %stop_reason, "Candidate converged.");
                return Ok(Alignment {
                    transform,
                    matching: matches.matching,
                    weights,
                    geometric_sq,
                    feature_sq: matches
                        .feature_sq
                        .iter()
                        .map(|f| f.unwrap_or(f64::NAN))
                        .collect(),
                    error,
                    iterations,
                    candidate,
                    initial_angles: *initial_angles,
                    stop_reason,
                });
            }
        }
    }

    /// `Σ w_i (‖x_i − m_match(i)‖² / σ_i² + F[i, match(i)])` over matched points,
    /// together with the raw squared distance of each pair.
    fn weighted_error(
        &self,
        transformed: &[Point3<f64>],
        matches: &MatchOutcome,
        weights: &[f64],
        matcher: &Matcher,
    ) -> (f64, Vec<f64>) {
        let molecule_points = self.molecule.positions();
        let inv_geom_var = matcher.inv_geom_var();
        let mut error = 0.0;
        let geometric_sq = matches
            .matching
            .iter()
            .enumerate()
            .map(|(i, m)| match m {
                Some(j) => {
                    let g = (transformed[i] - molecule_points[*j]).norm_squared();
                    error += weights[i] * (g * inv_geom_var[i] + self.feature_distances.get(i, *j));
                    g
                }
                None => f64::NAN,
            })
            .collect();
        (error, geometric_sq)
    }
}

fn matched_pairs(
    transformed: &[Point3<f64>],
    molecule: &[Point3<f64>],
    matches: &MatchOutcome,
    weights: &[f64],
) -> (Vec<Point3<f64>>, Vec<Point3<f64>>, Vec<f64>) {
    let mut moving = Vec::with_capacity(transformed.len());
    let mut target = Vec::with_capacity(transformed.len());
    let mut pair_weights = Vec::with_capacity(transformed.len());
    for (i, m) in matches.matching.iter().enumerate() {
        if let Some(j) = m {
            moving.push(transformed[i]);
            target.push(molecule[*j]);
            pair_weights.push(weights[i]);
        }
    }
    (moving, target, pair_weights)
}

/// Any single satisfied criterion stops the loop.
fn check_convergence(
    convergence: &ConvergenceConfig,
    max_iterations: usize,
    iterations: usize,
    error: f64,
    angle_degrees: f64,
    translation_step: f64,
) -> Option<StopReason> {
    if iterations >= max_iterations {
        Some(StopReason::MaxIterations)
    } else if error <= convergence.error_threshold {
        Some(StopReason::ErrorThreshold)
    } else if angle_degrees.abs() <= convergence.angle_threshold_degrees {
        Some(StopReason::AngleThreshold)
    } else if translation_step <= convergence.translation_threshold {
        Some(StopReason::TranslationThreshold)
    } else {
        None
    }
}

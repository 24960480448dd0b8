use crate::core::io::report::MatchRecord;
use crate::core::models::molecule::Molecule;
use crate::core::models::template::MoleculeTemplate;
use crate::core::utils::geometry::{
    EulerAngles, apply_geom_transformation, calculate_rmsd, rotation_matrix_from_angles,
};
use nalgebra::{Matrix3, Point3, Vector3};

/// A rigid motion `p ↦ R·p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_angles(angles: &EulerAngles) -> Self {
        Self {
            rotation: rotation_matrix_from_angles(angles),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        apply_geom_transformation(&self.rotation, &self.translation, points)
    }

    /// Returns `delta ∘ self`, i.e. `self` applied first.
    pub fn then(&self, delta: &RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: delta.rotation * self.rotation,
            translation: delta.translation + delta.rotation * self.translation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxIterations,
    ErrorThreshold,
    AngleThreshold,
    TranslationThreshold,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MaxIterations => "max iterations",
            Self::ErrorThreshold => "error threshold",
            Self::AngleThreshold => "angle threshold",
            Self::TranslationThreshold => "translation threshold",
        };
        write!(f, "{}", s)
    }
}

/// Final state of one ICP run started from a single candidate rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub transform: RigidTransform,
    /// `matching[i]` is the molecule point matched to template point `i`.
    pub matching: Vec<Option<usize>>,
    pub weights: Vec<f64>,
    /// Raw squared Euclidean distance of each matched pair under `transform`.
    pub geometric_sq: Vec<f64>,
    /// Normalized squared feature distance of each matched pair.
    pub feature_sq: Vec<f64>,
    pub error: f64,
    pub iterations: usize,
    pub candidate: usize,
    pub initial_angles: EulerAngles,
    pub stop_reason: StopReason,
}

impl Alignment {
    pub fn aligned_points(&self, template: &MoleculeTemplate) -> Vec<Point3<f64>> {
        self.transform.apply(template.positions())
    }

    /// RMSD over matched pairs; `None` if nothing is matched.
    pub fn rmsd(&self, template: &MoleculeTemplate, molecule: &Molecule) -> Option<f64> {
        let aligned = self.aligned_points(template);
        let (moved, targets): (Vec<_>, Vec<_>) = self
            .matching
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                m.and_then(|j| molecule.positions().get(j).map(|target| (aligned[i], *target)))
            })
            .unzip();
        calculate_rmsd(&moved, &targets)
    }

    pub fn match_records(&self) -> Vec<MatchRecord> {
        self.matching
            .iter()
            .enumerate()
            .map(|(i, &molecule_index)| MatchRecord {
                template_index: i,
                molecule_index,
                weight: self.weights.get(i).copied().unwrap_or(0.0),
                geometric_sq: self.geometric_sq.get(i).copied().unwrap_or(f64::NAN),
                feature_sq: self.feature_sq.get(i).copied().unwrap_or(f64::NAN),
            })
            .collect()
    }

    pub fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            index: self.candidate,
            initial_angles: self.initial_angles,
            error: self.error,
            iterations: self.iterations,
            stop_reason: self.stop_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSummary {
    pub index: usize,
    pub initial_angles: EulerAngles,
    pub error: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutcome {
    pub best: Alignment,
    /// One entry per candidate rotation, in candidate order.
    pub candidates: Vec<CandidateSummary>,
}

impl AlignmentOutcome {
    /// Keeps the first candidate whose error is strictly lower than every
    /// earlier one. Returns `None` for an empty input.
    pub fn select_best(alignments: Vec<Alignment>) -> Option<Self> {
        alignments
            .into_iter()
            .fold(CandidateReduction::default(), CandidateReduction::push)
            .finish()
    }
}

/// Running best-candidate reduction that keeps only summaries of the losers.
///
/// The winner is the lowest error, ties going to the lowest candidate index,
/// so partial reductions can be merged in any grouping.
#[derive(Debug, Clone, Default)]
pub struct CandidateReduction {
    best: Option<Alignment>,
    candidates: Vec<CandidateSummary>,
}

impl CandidateReduction {
    pub fn push(mut self, alignment: Alignment) -> Self {
        self.candidates.push(alignment.summary());
        self.best = Self::better(self.best.take(), Some(alignment));
        self
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.candidates.extend(other.candidates);
        self.best = Self::better(self.best.take(), other.best);
        self
    }

    pub fn finish(mut self) -> Option<AlignmentOutcome> {
        self.candidates.sort_by_key(|c| c.index);
        let candidates = self.candidates;
        self.best.map(|best| AlignmentOutcome { best, candidates })
    }

    fn better(a: Option<Alignment>, b: Option<Alignment>) -> Option<Alignment> {
        match (a, b) {
            (Some(a), Some(b)) => {
                let order = a
                    .error
                    .total_cmp(&b.error)
                    .then(a.candidate.cmp(&b.candidate));
                Some(if order.is_le() { a } else { b })
            }
            (a, None) => a,
            (None, b) => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::point_cloud::PointCloud;

    fn alignment(candidate: usize, error: f64) -> Alignment {
        Alignment {
            transform: RigidTransform::identity(),
            matching: vec![Some(0)],
            weights: vec![1.0],
            geometric_sq: vec![0.0],
            feature_sq: vec![0.0],
            error,
            iterations: 1,
            candidate,
            initial_angles: EulerAngles::default(),
            stop_reason: StopReason::AngleThreshold,
        }
    }

    #[test]
    fn select_best_keeps_first_of_equal_errors() {
        let outcome = AlignmentOutcome::select_best(vec![
            alignment(0, 2.0),
            alignment(1, 1.0),
            alignment(2, 1.0),
            alignment(3, 1.5),
        ])
        .unwrap();
        assert_eq!(outcome.best.candidate, 1);
        assert_eq!(outcome.candidates.len(), 4);
        assert_eq!(outcome.candidates[3].error, 1.5);
    }

    #[test]
    fn merged_reductions_match_sequential_selection() {
        let errors = [3.0, 1.0, 2.0, 1.0, 0.5, 0.5, 4.0];
        let sequential = AlignmentOutcome::select_best(
            errors.iter().enumerate().map(|(i, &e)| alignment(i, e)).collect(),
        )
        .unwrap();

        let chunk = |range: std::ops::Range<usize>| {
            range.fold(CandidateReduction::default(), |acc, i| acc.push(alignment(i, errors[i])))
        };
        let merged = chunk(0..2)
            .merge(chunk(2..2))
            .merge(chunk(2..5).merge(chunk(5..7)))
            .finish()
            .unwrap();

        assert_eq!(merged.best.candidate, 4);
        assert_eq!(merged, sequential);
        let order: Vec<_> = merged.candidates.iter().map(|c| c.index).collect();
        assert_eq!(order, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn select_best_of_nothing_is_none() {
        assert!(AlignmentOutcome::select_best(Vec::new()).is_none());
    }

    #[test]
    fn then_composes_in_application_order() {
        let first = RigidTransform {
            rotation: Matrix3::identity(),
            translation: Vector3::new(1.0, 0.0, 0.0),
        };
        let second = RigidTransform {
            rotation: rotation_matrix_from_angles(&EulerAngles::new(0.0, 0.0, 90.0)),
            translation: Vector3::new(0.0, 0.0, 2.0),
        };
        let combined = first.then(&second);
        let p = [Point3::new(1.0, 0.0, 0.0)];
        let expected = second.apply(&first.apply(&p));
        let got = combined.apply(&p);
        assert!((got[0] - expected[0]).norm() < 1e-12);
        assert!((got[0] - Point3::new(0.0, 2.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn rmsd_uses_matched_pairs_only() {
        let template = MoleculeTemplate::with_unit_deviations(
            "t",
            PointCloud::without_features(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]),
        );
        let molecule = Molecule::new(
            "m",
            PointCloud::without_features(vec![Point3::new(0.0, 0.0, 2.0)]),
        );
        let mut a = alignment(0, 0.0);
        a.matching = vec![Some(0), None];
        a.weights = vec![1.0, 0.0];
        assert!((a.rmsd(&template, &molecule).unwrap() - 2.0).abs() < 1e-12);

        let records = a.match_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].molecule_index, None);
        assert_eq!(records[1].weight, 0.0);
    }
}

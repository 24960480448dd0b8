use crate::core::models::molecule::Molecule;
use crate::core::models::template::MoleculeTemplate;
use crate::engine::config::MatchingMethod;
use crate::engine::error::EngineError;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::{DMatrix, Point3};
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Relative slack on the k-d tree search radius so rounding never drops the
/// true minimum from the candidate set.
const RADIUS_SLACK: f64 = 1e-9;

/// Squared normalized feature distance for every (template, molecule) point pair.
///
/// Template feature `f` is compared against the molecule column carrying the
/// same name, scaled by the template's deviation for that point and feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDistances {
    values: DMatrix<f64>,
    row_minima: Vec<f64>,
}

impl FeatureDistances {
    pub fn compute(template: &MoleculeTemplate, molecule: &Molecule) -> Result<Self, EngineError> {
        let template_cloud = template.cloud();
        let columns = template_cloud
            .feature_names()
            .iter()
            .map(|name| {
                molecule
                    .cloud()
                    .feature_index(name)
                    .ok_or_else(|| EngineError::MissingFeature {
                        feature: name.clone(),
                        molecule: molecule.name.clone(),
                    })
            })
            .collect::<Result<Vec<usize>, _>>()?;

        let template_features = template_cloud.features();
        let molecule_features = molecule.cloud().features();
        let deviations = template.feature_dev();
        let (n_template, n_molecule) = (template.len(), molecule.len());

        let row = |i: usize| -> Vec<f64> {
            (0..n_molecule)
                .map(|j| {
                    columns
                        .iter()
                        .enumerate()
                        .map(|(f, &col)| {
                            let diff = (template_features[(i, f)] - molecule_features[(j, col)])
                                / deviations[(i, f)];
                            diff * diff
                        })
                        .sum()
                })
                .collect()
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f64>> = (0..n_template).into_par_iter().map(row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f64>> = (0..n_template).map(row).collect();

        let values = DMatrix::from_fn(n_template, n_molecule, |i, j| rows[i][j]);
        Ok(Self::from_matrix(values))
    }

    /// Wraps a precomputed `N_template × N_molecule` matrix.
    pub fn from_matrix(values: DMatrix<f64>) -> Self {
        let row_minima = values
            .row_iter()
            .map(|row| row.iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        Self { values, row_minima }
    }

    pub fn zeros(n_template: usize, n_molecule: usize) -> Self {
        Self::from_matrix(DMatrix::zeros(n_template, n_molecule))
    }

    #[inline]
    pub fn get(&self, template_index: usize, molecule_index: usize) -> f64 {
        self.values[(template_index, molecule_index)]
    }

    pub fn row_min(&self, template_index: usize) -> f64 {
        self.row_minima[template_index]
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }
}

/// Result of matching every template point to a molecule point.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matching: Vec<Option<usize>>,
    /// Raw squared Euclidean distance of each pair.
    pub geom_sq: Vec<f64>,
    pub feature_sq: Vec<Option<f64>>,
}

impl MatchOutcome {
    fn with_capacity(n: usize) -> Self {
        Self {
            matching: Vec::with_capacity(n),
            geom_sq: Vec::with_capacity(n),
            feature_sq: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, best: Option<(usize, f64)>, features: &FeatureDistances, i: usize) {
        match best {
            Some((j, g)) => {
                self.matching.push(Some(j));
                self.geom_sq.push(g);
                self.feature_sq.push(Some(features.get(i, j)));
            }
            None => {
                self.matching.push(None);
                self.geom_sq.push(f64::NAN);
                self.feature_sq.push(None);
            }
        }
    }
}

/// Lowest combined distance among `candidates`, ties broken by lowest index.
fn best_of(
    point: &Point3<f64>,
    i: usize,
    candidates: impl Iterator<Item = usize>,
    molecule: &[Point3<f64>],
    inv_geom_var: f64,
    features: &FeatureDistances,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for j in candidates {
        let g = (point - molecule[j]).norm_squared();
        let d = g * inv_geom_var + features.get(i, j);
        let better = match best {
            None => !d.is_nan(),
            Some((bj, _, bd)) => d < bd || (d == bd && j < bj),
        };
        if better {
            best = Some((j, g, d));
        }
    }
    best.map(|(j, g, _)| (j, g))
}

/// Scans every molecule point in index order; the first strict minimum wins.
pub fn match_exhaustive(
    transformed: &[Point3<f64>],
    molecule: &[Point3<f64>],
    inv_geom_var: &[f64],
    features: &FeatureDistances,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::with_capacity(transformed.len());
    for (i, p) in transformed.iter().enumerate() {
        let best = best_of(p, i, 0..molecule.len(), molecule, inv_geom_var[i], features);
        outcome.push(best, features, i);
    }
    outcome
}

/// k-d tree over the distinct positions of a molecule.
///
/// Coincident points share one tree entry and are expanded back to every
/// original index on lookup.
pub struct SurfaceIndex {
    tree: ImmutableKdTree<f64, 3>,
    members: Vec<Vec<usize>>,
}

impl SurfaceIndex {
    pub fn build(molecule: &[Point3<f64>]) -> Self {
        let mut slots: HashMap<[u64; 3], usize> = HashMap::with_capacity(molecule.len());
        let mut coords: Vec<[f64; 3]> = Vec::with_capacity(molecule.len());
        let mut members: Vec<Vec<usize>> = Vec::with_capacity(molecule.len());
        for (j, p) in molecule.iter().enumerate() {
            // +0.0 folds -0.0 onto the same key.
            let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
            let slot = *slots.entry(key).or_insert_with(|| {
                coords.push([p.x, p.y, p.z]);
                members.push(Vec::new());
                coords.len() - 1
            });
            members[slot].push(j);
        }
        Self {
            tree: ImmutableKdTree::new_from_slice(&coords),
            members,
        }
    }

    /// Number of distinct positions held by the tree.
    pub fn distinct_len(&self) -> usize {
        self.members.len()
    }

    /// Lowest molecule index at the position nearest to `query`.
    fn nearest(&self, query: &[f64; 3]) -> Option<usize> {
        if self.members.is_empty() {
            return None;
        }
        let slot = self.tree.nearest_one::<SquaredEuclidean>(query).item as usize;
        self.members.get(slot).and_then(|m| m.first().copied())
    }

    /// Every molecule index within squared distance `radius` of `query`.
    fn within(&self, query: &[f64; 3], radius: f64) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .within_unsorted::<SquaredEuclidean>(query, radius)
            .into_iter()
            .filter_map(|n| self.members.get(n.item as usize))
            .flat_map(|m| m.iter().copied())
    }
}

/// k-d tree variant of [`match_exhaustive`] with identical results.
///
/// The geometric nearest neighbor bounds the best combined distance, so only
/// molecule points within `(bound − min_j F[i,j]) · σ²` need to be re-scored.
pub fn match_kd_tree(
    transformed: &[Point3<f64>],
    molecule: &[Point3<f64>],
    index: &SurfaceIndex,
    inv_geom_var: &[f64],
    features: &FeatureDistances,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::with_capacity(transformed.len());
    for (i, p) in transformed.iter().enumerate() {
        let query = [p.x, p.y, p.z];
        let Some(j0) = index.nearest(&query) else {
            outcome.push(None, features, i);
            continue;
        };
        let bound = (p - molecule[j0]).norm_squared() * inv_geom_var[i] + features.get(i, j0);
        let radius = ((bound - features.row_min(i)) / inv_geom_var[i]).max(0.0);
        let radius = radius * (1.0 + RADIUS_SLACK) + RADIUS_SLACK;

        let best = if radius.is_finite() {
            let candidates = index.within(&query, radius).chain(std::iter::once(j0));
            best_of(p, i, candidates, molecule, inv_geom_var[i], features)
        } else {
            best_of(p, i, 0..molecule.len(), molecule, inv_geom_var[i], features)
        };
        outcome.push(best, features, i);
    }
    outcome
}

/// Matching strategy bound to one (template, molecule) pair.
pub struct Matcher<'a> {
    molecule: &'a [Point3<f64>],
    features: &'a FeatureDistances,
    inv_geom_var: Vec<f64>,
    index: Option<SurfaceIndex>,
}

impl<'a> Matcher<'a> {
    pub fn new(
        method: MatchingMethod,
        molecule: &'a [Point3<f64>],
        features: &'a FeatureDistances,
        geom_dev: &[f64],
    ) -> Self {
        let index = match method {
            MatchingMethod::Exhaustive => None,
            MatchingMethod::KdTree => Some(SurfaceIndex::build(molecule)),
        };
        Self {
            molecule,
            features,
            inv_geom_var: geom_dev.iter().map(|s| 1.0 / (s * s)).collect(),
            index,
        }
    }

    pub fn inv_geom_var(&self) -> &[f64] {
        &self.inv_geom_var
    }

    pub fn find_matches(&self, transformed: &[Point3<f64>]) -> MatchOutcome {
        match &self.index {
            Some(index) => match_kd_tree(
                transformed,
                self.molecule,
                index,
                &self.inv_geom_var,
                self.features,
            ),
            None => {
                match_exhaustive(transformed, self.molecule, &self.inv_geom_var, self.features)
            }
        }
    }
}

use nalgebra::{DMatrix, Point3};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Feature matrix has {rows} rows but the cloud has {points} points")]
    FeatureRowMismatch { points: usize, rows: usize },
    #[error("Feature matrix has {columns} columns but {names} feature names were given")]
    FeatureNameMismatch { columns: usize, names: usize },
    #[error("Duplicate feature name: '{0}'")]
    DuplicateFeatureName(String),
    #[error("Geometric deviation vector has {deviations} entries but the template has {points} points")]
    DeviationLengthMismatch { points: usize, deviations: usize },
    #[error("Feature deviation matrix is {found:?} but the feature matrix is {expected:?}")]
    DeviationShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Deviation for point {point} must be strictly positive and finite (value: {value})")]
    InvalidDeviation { point: usize, value: f64 },
}

/// An ordered set of 3-D points with a row-aligned chemical feature matrix.
///
/// Row `i` of [`features`](Self::features) describes point `i`; column `f` carries
/// the meaning given by `feature_names()[f]`. The cloud is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    positions: Vec<Point3<f64>>,
    features: DMatrix<f64>,
    feature_names: Vec<String>,
}

impl PointCloud {
    pub fn new(
        positions: Vec<Point3<f64>>,
        features: DMatrix<f64>,
        feature_names: Vec<String>,
    ) -> Result<Self, ModelError> {
        if features.nrows() != positions.len() {
            return Err(ModelError::FeatureRowMismatch {
                points: positions.len(),
                rows: features.nrows(),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(ModelError::FeatureNameMismatch {
                columns: features.ncols(),
                names: feature_names.len(),
            });
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ModelError::DuplicateFeatureName(name.clone()));
            }
        }
        Ok(Self {
            positions,
            features,
            feature_names,
        })
    }

    /// Builds a cloud that carries coordinates only.
    pub fn without_features(positions: Vec<Point3<f64>>) -> Self {
        let rows = positions.len();
        Self {
            positions,
            features: DMatrix::zeros(rows, 0),
            feature_names: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    #[inline]
    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.positions.is_empty() {
            return None;
        }
        let sum = self
            .positions
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.positions.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_accepts_consistent_shapes() {
        let positions = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let features = DMatrix::from_row_slice(2, 2, &[0.1, 0.2, 0.3, 0.4]);
        let cloud = PointCloud::new(positions, features, names(&["charge", "hbond"])).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.num_features(), 2);
        assert_eq!(cloud.feature_index("hbond"), Some(1));
        assert_eq!(cloud.feature_index("missing"), None);
        assert_eq!(cloud.features()[(1, 0)], 0.3);
    }

    #[test]
    fn new_rejects_row_mismatch() {
        let positions = vec![Point3::origin()];
        let features = DMatrix::zeros(2, 1);
        let result = PointCloud::new(positions, features, names(&["charge"]));
        assert_eq!(
            result,
            Err(ModelError::FeatureRowMismatch { points: 1, rows: 2 })
        );
    }

    #[test]
    fn new_rejects_name_count_mismatch() {
        let positions = vec![Point3::origin()];
        let features = DMatrix::zeros(1, 2);
        let result = PointCloud::new(positions, features, names(&["charge"]));
        assert!(matches!(
            result,
            Err(ModelError::FeatureNameMismatch {
                columns: 2,
                names: 1
            })
        ));
    }

    #[test]
    fn new_rejects_duplicate_names() {
        let positions = vec![Point3::origin()];
        let features = DMatrix::zeros(1, 2);
        let result = PointCloud::new(positions, features, names(&["charge", "charge"]));
        assert_eq!(
            result,
            Err(ModelError::DuplicateFeatureName("charge".to_string()))
        );
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let cloud = PointCloud::without_features(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 3.0, -3.0),
        ]);
        let c = cloud.centroid().unwrap();
        assert!((c - Point3::new(1.0, 1.0, -1.0)).norm() < 1e-12);
        assert!(PointCloud::without_features(vec![]).centroid().is_none());
    }
}

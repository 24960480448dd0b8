use super::point_cloud::{ModelError, PointCloud};
use nalgebra::{DMatrix, Point3};

/// A small reference point set with per-point tolerances.
///
/// Each point carries a geometric standard deviation, and each (point, feature)
/// pair a chemical standard deviation. Both are used only to normalize distances
/// during matching, so they must be strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeTemplate {
    pub name: String,
    cloud: PointCloud,
    geom_dev: Vec<f64>,
    feature_dev: DMatrix<f64>,
}

impl MoleculeTemplate {
    pub fn new(
        name: impl Into<String>,
        cloud: PointCloud,
        geom_dev: Vec<f64>,
        feature_dev: DMatrix<f64>,
    ) -> Result<Self, ModelError> {
        if geom_dev.len() != cloud.len() {
            return Err(ModelError::DeviationLengthMismatch {
                points: cloud.len(),
                deviations: geom_dev.len(),
            });
        }
        let expected = cloud.features().shape();
        if feature_dev.shape() != expected {
            return Err(ModelError::DeviationShapeMismatch {
                expected,
                found: feature_dev.shape(),
            });
        }
        for (point, &value) in geom_dev.iter().enumerate() {
            check_deviation(point, value)?;
        }
        for point in 0..feature_dev.nrows() {
            for &value in feature_dev.row(point).iter() {
                check_deviation(point, value)?;
            }
        }
        Ok(Self {
            name: name.into(),
            cloud,
            geom_dev,
            feature_dev,
        })
    }

    /// Builds a template whose deviations are all `1.0`, i.e. raw distances.
    pub fn with_unit_deviations(name: impl Into<String>, cloud: PointCloud) -> Self {
        let (rows, cols) = cloud.features().shape();
        Self {
            name: name.into(),
            geom_dev: vec![1.0; rows],
            feature_dev: DMatrix::from_element(rows, cols, 1.0),
            cloud,
        }
    }

    #[inline]
    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        self.cloud.positions()
    }

    #[inline]
    pub fn geom_dev(&self) -> &[f64] {
        &self.geom_dev
    }

    #[inline]
    pub fn feature_dev(&self) -> &DMatrix<f64> {
        &self.feature_dev
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }
}

fn check_deviation(point: usize, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidDeviation { point, value })
    }
}

use super::point_cloud::PointCloud;
use nalgebra::Point3;

/// A target molecule: the surface point cloud a template is aligned onto.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub name: String,
    cloud: PointCloud,
}

impl Molecule {
    pub fn new(name: impl Into<String>, cloud: PointCloud) -> Self {
        Self {
            name: name.into(),
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
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }
}

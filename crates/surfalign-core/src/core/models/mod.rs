//! # Core Models Module
//!
//! Data structures describing the two sides of an alignment: the target
//! [`molecule::Molecule`] and the [`template::MoleculeTemplate`] that is moved onto it.
//!
//! ## Key Components
//!
//! - [`point_cloud`] - Ordered 3-D coordinates with a row-aligned chemical feature matrix
//! - [`molecule`] - A named target point cloud
//! - [`template`] - A point cloud with per-point geometric and per-feature deviations
//!
//! Coordinates are exposed as borrowed slices tied to the owning cloud; nothing in
//! the engine keeps its own aliased copy of them.
//!
//! ```ignore
//! use surfalign::core::models::{point_cloud::PointCloud, template::MoleculeTemplate};
//!
//! let cloud = PointCloud::without_features(points);
//! let template = MoleculeTemplate::with_unit_deviations("site", cloud);
//! ```

pub mod molecule;
pub mod point_cloud;
pub mod template;

//! # SurfAlign Core Library
//!
//! Rigid alignment of a small chemically annotated template point set onto a
//! molecular surface point cloud, using an iterative-closest-point search whose
//! correspondences weigh chemical feature similarity alongside geometry.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless point-cloud models (`PointCloud`,
//!   `Molecule`, `MoleculeTemplate`), rotation and transform geometry, and readers
//!   and writers for VRML coordinates, AMAT feature tables and CSV match reports.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the closed-form weighted rotation
//!   solver, nearest-neighbor matching (exhaustive or k-d tree), feature-based
//!   weighting, the multi-start ICP driver and a cache of loaded inputs.
//!
//! - **[`workflows`]: The Public API.** Complete alignment procedures with progress
//!   reporting, for one molecule or a batch.

pub mod core;
pub mod engine;
pub mod workflows;

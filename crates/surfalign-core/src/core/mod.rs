//! # Core Module
//!
//! This module provides the stateless building blocks of SURFALIGN: the data models
//! for molecules and templates, the rigid-body geometry kernel, and file I/O.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Point clouds, target molecules and deviation-carrying templates
//! - **Geometry** ([`utils::geometry`]) - Euler angles, axis-angle rotations, rigid transforms,
//!   weighted centroids
//! - **File I/O** ([`io`]) - VRML geometry, ASCII matrix feature tables, CSV reports
//!
//! Nothing in this layer keeps state between calls; the alignment engine in
//! [`crate::engine`] builds on it.

pub mod io;
pub mod models;
pub mod utils;

//! Provides input/output functionality for molecule and template files.
//!
//! Geometry is read from a VRML subset and chemical features from ASCII matrix
//! tables; [`loader`] combines the two into models. Matching reports are written
//! as CSV.

pub mod amat;
pub mod loader;
pub mod report;
pub mod traits;
pub mod vrml;

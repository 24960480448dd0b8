//! # Workflows Module
//!
//! High-level entry points that tie the engine and the core layer together.
//!
//! - **Alignment Workflow** ([`align`]) - aligns a template onto one molecule, or onto
//!   a batch of molecules loaded through a shared cache, and packages the best
//!   transform, aligned coordinates, RMSD and per-point matches into a report.

pub mod align;

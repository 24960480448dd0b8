//! Computational units of an alignment run.
//!
//! [`matching`] pairs every template point with its closest molecule point under
//! the combined geometric and chemical distance; [`icp`] iterates matching and
//! rotation estimation from each candidate orientation and keeps the best result.

pub mod icp;
pub mod matching;

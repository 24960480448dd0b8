//! # Engine Module
//!
//! The stateful layer that turns a template and a molecule into an alignment.
//!
//! - **Configuration** ([`config`]) - iteration limits, convergence thresholds, start
//!   orientations, weighting and matching strategies
//! - **Solver** ([`solver`]) - closed-form weighted rotation between matched point sets
//! - **Weighting** ([`weighting`]) - per-pair confidence weights from chemical distance
//! - **Tasks** ([`tasks`]) - the nearest-neighbor matcher and the multi-start ICP driver
//! - **State** ([`state`]) - rigid transforms, per-candidate results and the final outcome
//! - **Cache** ([`cache`]) - LRU cache of loaded point sets keyed by source files
//! - **Progress** ([`progress`]) and **Errors** ([`error`])

pub mod cache;
pub mod config;
pub mod error;
pub mod progress;
pub mod solver;
pub mod state;
pub mod tasks;
pub(crate) mod utils;
pub mod weighting;

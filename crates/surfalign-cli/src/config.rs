//! Layered configuration for the `align` command.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file given with
//! `--config`, `-S key=value` settings, then dedicated command-line flags.

mod builder;
mod file;
mod models;

pub use builder::build_config;

//! CLI command implementations.

pub mod config;
pub mod doctor;
pub mod serve;

use std::path::Path;

use cmf_core::{error::format_error_with_suggestion, Config};

/// Load and validate configuration, folding the recovery hint into the error.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Config::load_validated(path).map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))
}

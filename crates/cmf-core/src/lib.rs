//! # cmf-core
//!
//! Core types shared by the CMF MCP server crates.
//!
//! This crate provides:
//! - Configuration system (defaults, TOML files, environment)
//! - Configuration validation
//! - Common error types

pub mod config;
pub mod error;

pub use config::{CmfConfig, Config, HttpConfig, ServerConfig, TransportKind, BASE_URL_ENV_VARS};
pub use error::{Error, Result};

//! # cmf-client
//!
//! Client for the REST API of a Common Metadata Framework (CMF) server.
//!
//! This crate provides:
//! - The [`CmfApi`] trait, one async method per supported query
//! - [`CmfClient`], a reqwest-backed implementation
//! - Pagination over the paged listing endpoints
//!
//! ## Example
//!
//! ```ignore
//! use cmf_client::{CmfApi, CmfClient};
//!
//! let client = CmfClient::new("http://localhost:8080")?;
//! let executions = client.get_executions("Test-env").await?;
//! client.close_session().await?;
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod traits;

pub use client::CmfClient;
pub use error::CmfError;
pub use models::Page;
pub use traits::CmfApi;

/// Result type alias using [`CmfError`].
pub type Result<T> = std::result::Result<T, CmfError>;

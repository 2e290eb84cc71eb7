//! Shared types, error model, and configuration for simreport.
//!
//! This crate is the foundation depended on by all other simreport crates.
//! It provides:
//! - [`SimReportError`], the unified error type
//! - Domain types ([`FieldValue`], [`ParameterSet`], [`Row`], [`RunId`])
//! - The parameter vocabulary and output schema ([`schema`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DerivedConfig, DiscoveryConfig, MissingInputPolicy, OpenRouterConfig, RowDefaults,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SimReportError};
pub use types::{FieldValue, ParameterSet, Row, RunId};

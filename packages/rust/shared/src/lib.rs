//! Shared types, error model, and configuration for schemewatch.
//!
//! This crate is the foundation depended on by all other schemewatch crates.
//! It provides:
//! - [`SchemeWatchError`] — the unified error type
//! - Domain types ([`SourceConfig`], [`RawItem`], [`CanonicalPayload`], [`Severity`])
//! - Configuration ([`AppConfig`], config loading, token validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchPolicyConfig, IngestConfig, LimitsConfig, PipelineConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, load_sources,
    validate_admin_token,
};
pub use error::{Result, SchemeWatchError};
pub use types::{
    CanonicalPayload, ChangeInfo, RawItem, RunSummary, Severity, SourceConfig, SourceKind,
    SourceRef,
};

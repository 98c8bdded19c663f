//! Core pipeline orchestration for schemewatch.
//!
//! This crate ties together source dispatch, fetching, normalization,
//! deduplication, and downstream delivery into the end-to-end batch run.

pub mod ingest;
pub mod pipeline;

pub use ingest::{IngestClient, IngestOutcome, IngestReceipt};
pub use pipeline::{PipelineRunner, ProgressReporter, SilentProgress};

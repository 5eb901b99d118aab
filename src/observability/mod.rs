// observability/mod.rs - Tracing
//
//! Structured logging via `tracing`. Metrics/dashboards are an external
//! collaborator (§1) and are not part of this crate.

mod tracing_setup;

pub use tracing_setup::{init_tracing, TracingConfig, TracingFormat};

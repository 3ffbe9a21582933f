//! janus-harness — Configuration and batch run driver for janus evaluations.
//!
//! Wraps a [`TemplateSdk`](janus_core::TemplateSdk) with a run-wide metrics
//! context and writes templates, simmat and mask files.

pub mod config;
pub mod harness;

pub use config::{ConfigError, HarnessConfig};
pub use harness::{Harness, HarnessError};

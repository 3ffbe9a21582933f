//! janus-core — Batch evaluation engine for face recognition SDKs.
//!
//! Reads metadata tables, drives an external SDK through the template
//! lifecycle one subject at a time, and writes similarity and mask matrices.
//! The recognition algorithm itself stays behind the [`TemplateSdk`] trait.

pub mod enroll;
pub mod error;
#[cfg(any(test, feature = "fake-sdk"))]
pub mod fake;
pub mod gallery;
pub mod matrix;
pub mod media;
pub mod metadata;
pub mod metrics;
pub mod sdk;
pub mod template;
pub mod types;

pub use enroll::{enroll_all, enroll_gallery, enroll_template, TemplateIterator, TemplateSet};
pub use error::{JanusError, Result};
pub use gallery::{Gallery, MemoryGallery};
pub use matrix::{MatrixHeader, PayloadKind, MASK_MATCH, MASK_NON_MATCH};
pub use media::Media;
pub use metadata::{Metadata, MetadataRow};
pub use metrics::{Metrics, Stage, StageSummary};
pub use sdk::TemplateSdk;
pub use template::FlatTemplate;
pub use types::{Attribute, AttributeList, TemplateId};

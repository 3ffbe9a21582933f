//! Finalized template value.

use crate::error::{JanusError, Result};
use crate::metrics::{Metrics, Stage};
use crate::sdk::TemplateSdk;
use std::sync::Arc;

const BYTES_PER_KB: f64 = 1024.0;

#[derive(Debug)]
struct FlatInner {
    data: Vec<u8>,
    error: Option<JanusError>,
}

/// Immutable, shared result of finalizing a template.
///
/// Cloning shares the underlying buffer; it is freed when the last clone is
/// dropped. A failed finalize still produces a value, carrying the error,
/// which is returned from [`data`](Self::data) and [`compare`](Self::compare).
#[derive(Debug, Clone)]
pub struct FlatTemplate {
    inner: Arc<FlatInner>,
}

impl FlatTemplate {
    /// Finalize `template` into a buffer of the SDK's maximum template size.
    ///
    /// Records one [`Stage::FinalizeTemplate`] sample whether or not the SDK
    /// succeeds, and a [`Stage::TemplateSize`] sample (KB) on success.
    pub fn finalize<S: TemplateSdk>(sdk: &S, template: S::Template, metrics: &Metrics) -> Self {
        let capacity = sdk.max_template_size();
        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(capacity).is_err() {
            tracing::warn!(capacity, "template buffer allocation failed");
            return Self::failed(JanusError::OutOfMemory(capacity));
        }
        buffer.resize(capacity, 0);

        let result = metrics.time(Stage::FinalizeTemplate, || {
            sdk.finalize_template(template, &mut buffer)
        });

        match result {
            Ok(len) if len <= capacity => {
                buffer.truncate(len);
                metrics.record(Stage::TemplateSize, len as f64 / BYTES_PER_KB);
                Self::from_bytes(buffer)
            }
            Ok(len) => {
                let e = JanusError::Unknown(format!(
                    "finalize reported {len} bytes, capacity is {capacity}"
                ));
                tracing::warn!(error = %e, "finalize failed");
                Self::failed(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "finalize failed");
                Self::failed(e)
            }
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(FlatInner { data, error: None }),
        }
    }

    pub fn failed(error: JanusError) -> Self {
        Self {
            inner: Arc::new(FlatInner {
                data: Vec::new(),
                error: Some(error),
            }),
        }
    }

    /// The template bytes, or the error stored at finalize time.
    pub fn data(&self) -> Result<&[u8]> {
        match &self.inner.error {
            Some(e) => Err(e.clone()),
            None => Ok(&self.inner.data),
        }
    }

    pub fn error(&self) -> Option<&JanusError> {
        self.inner.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.inner.error.is_none()
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Number of live handles sharing this buffer.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Score `self` against `other` with the SDK's verify.
    ///
    /// A stored finalize error on either side is returned before the SDK is
    /// called. One [`Stage::Verify`] sample is recorded per SDK call.
    pub fn compare<S: TemplateSdk>(&self, other: &Self, sdk: &S, metrics: &Metrics) -> Result<f32> {
        let a = self.data()?;
        let b = other.data()?;
        metrics.time(Stage::Verify, || sdk.verify(a, b))
    }
}

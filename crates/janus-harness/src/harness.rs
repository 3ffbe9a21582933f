//! Batch run driver.
//!
//! A [`Harness`] owns one initialized SDK and one [`Metrics`] context for
//! the lifetime of a run. Each operation reads its metadata tables, drives
//! enrollment, and writes its output file only once everything succeeded.

use crate::config::{ConfigError, HarnessConfig};
use janus_core::matrix;
use janus_core::{
    enroll_gallery, enroll_template, Gallery, JanusError, Metadata, Metrics, TemplateId,
    TemplateSdk,
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Janus(#[from] JanusError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write metrics {path}: {reason}")]
    Metrics { path: String, reason: String },
}

pub struct Harness<S: TemplateSdk> {
    config: HarnessConfig,
    sdk: S,
    metrics: Metrics,
}

impl<S: TemplateSdk> Harness<S> {
    /// Validate the SDK path and initialize the SDK. Fails fast before any work.
    pub fn new(config: HarnessConfig, mut sdk: S) -> Result<Self, HarnessError> {
        if !config.sdk_path.is_dir() {
            return Err(JanusError::InvalidSdkPath(config.sdk_path.display().to_string()).into());
        }
        sdk.initialize(&config.sdk_path, &config.temp_path, &config.algorithm)?;
        tracing::info!(
            sdk_path = %config.sdk_path.display(),
            algorithm = %config.algorithm,
            max_template_size = sdk.max_template_size(),
            "SDK initialized"
        );
        Ok(Self {
            config,
            sdk,
            metrics: Metrics::new(),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn prefix(&self) -> Option<&Path> {
        self.config.data_prefix.as_deref()
    }

    /// Enroll a single-subject table and write the finalized template bytes to `output`.
    ///
    /// Returns the subject id, or `None` for a header-only table.
    pub fn create_template(
        &self,
        metadata: &Path,
        output: &Path,
    ) -> Result<Option<TemplateId>, HarnessError> {
        let rows = Metadata::read(metadata)?;
        let (id, flat) = enroll_template(&self.sdk, rows, self.prefix(), &self.metrics)?;
        std::fs::write(output, flat.data()?)
            .map_err(|e| JanusError::Write(format!("{}: {e}", output.display())))?;
        tracing::info!(
            template_id = ?id,
            bytes = flat.len(),
            path = %output.display(),
            "template written"
        );
        Ok(id)
    }

    /// Enroll every subject of `metadata` into `gallery`.
    pub fn create_gallery<G: Gallery>(
        &self,
        metadata: &Path,
        gallery: &mut G,
    ) -> Result<usize, HarnessError> {
        let rows = Metadata::read(metadata)?;
        let count = enroll_gallery(
            &self.sdk,
            rows,
            self.prefix(),
            self.config.verbose,
            gallery,
            &self.metrics,
        )?;
        Ok(count)
    }

    pub fn create_simmat(
        &self,
        target: &Path,
        query: &Path,
        output: &Path,
    ) -> Result<(), HarnessError> {
        matrix::create_simmat(
            &self.sdk,
            target,
            query,
            output,
            self.prefix(),
            self.config.verbose,
            &self.metrics,
        )?;
        Ok(())
    }

    pub fn create_mask(
        &self,
        target: &Path,
        query: &Path,
        output: &Path,
    ) -> Result<(), HarnessError> {
        matrix::create_mask(target, query, output)?;
        Ok(())
    }

    pub fn write_metrics_json(&self, path: &Path) -> Result<(), HarnessError> {
        let metrics_err = |reason: String| HarnessError::Metrics {
            path: path.display().to_string(),
            reason,
        };
        let json = self
            .metrics
            .to_json()
            .map_err(|e| metrics_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| metrics_err(e.to_string()))
    }

    /// Write the configured metrics summary, shut the SDK down, and hand back
    /// the SDK and metrics. The summary is written even if shutdown fails.
    pub fn finish(mut self) -> Result<(S, Metrics), HarnessError> {
        if let Some(path) = self.config.metrics_json.clone() {
            self.write_metrics_json(&path)?;
        }
        self.sdk.shutdown()?;
        if self.config.verbose {
            if let Err(e) = self.metrics.print_summary() {
                tracing::warn!(error = %e, "failed to print metrics summary");
            }
        }
        tracing::info!("harness finished");
        Ok((self.sdk, self.metrics))
    }
}

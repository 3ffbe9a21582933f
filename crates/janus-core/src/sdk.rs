//! Capability surface of the external recognition SDK.
//!
//! The harness never looks inside images or templates; it only moves the
//! associated handles between these calls.

use crate::error::Result;
use crate::types::AttributeList;
use std::path::Path;

/// Operations the harness needs from a face recognition backend.
pub trait TemplateSdk {
    /// Decoded image, owned by the harness between read and free.
    type Image;
    /// In-progress template accumulator.
    type Template;

    /// One-time setup before any other call. Default: no-op.
    fn initialize(&mut self, _sdk_path: &Path, _temp_path: &Path, _algorithm: &str) -> Result<()> {
        Ok(())
    }

    /// Teardown after the last call. Default: no-op.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Upper bound on a finalized template's byte length.
    fn max_template_size(&self) -> usize;

    fn read_image(&self, path: &Path) -> Result<Self::Image>;

    /// Release a decoded image. Default: drop it.
    fn free_image(&self, image: Self::Image) {
        drop(image);
    }

    fn initialize_template(&self) -> Result<Self::Template>;

    fn add_image(
        &self,
        image: &Self::Image,
        attributes: &AttributeList,
        template: &mut Self::Template,
    ) -> Result<()>;

    /// Serialize `template` into `buffer`, sized to
    /// [`max_template_size`](Self::max_template_size). Returns the bytes written.
    fn finalize_template(&self, template: Self::Template, buffer: &mut [u8]) -> Result<usize>;

    /// Similarity between two finalized templates. Higher is more similar.
    fn verify(&self, a: &[u8], b: &[u8]) -> Result<f32>;
}

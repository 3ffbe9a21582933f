//! Deterministic in-memory SDK for tests.
//!
//! Images are never decoded: a "decoded image" is its path. A template
//! counts its images and sums their attribute values; the score of `a`
//! against `b` is `10 * images(a) + images(b)`.

use crate::error::{JanusError, Result};
use crate::sdk::TemplateSdk;
use crate::types::AttributeList;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeImage {
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct FakeTemplate {
    pub images: Vec<PathBuf>,
    pub attribute_sum: f32,
}

#[derive(Debug)]
pub struct FakeSdk {
    max_size: usize,
    fail_initialize_template: bool,
    fail_read_on: Option<String>,
    fail_add_on: Option<String>,
    fail_finalize_with_images: Option<usize>,
    fail_verify: bool,
    fail_shutdown: bool,
    session: Option<String>,
    reads: Mutex<Vec<PathBuf>>,
    frees: AtomicUsize,
    verifies: AtomicUsize,
}

impl Default for FakeSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSdk {
    /// Finalized templates are always this long: image count + attribute sum.
    pub const TEMPLATE_LEN: usize = 8;

    pub fn new() -> Self {
        Self {
            max_size: 64,
            fail_initialize_template: false,
            fail_read_on: None,
            fail_add_on: None,
            fail_finalize_with_images: None,
            fail_verify: false,
            fail_shutdown: false,
            session: None,
            reads: Mutex::new(Vec::new()),
            frees: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn failing_initialize_template(mut self) -> Self {
        self.fail_initialize_template = true;
        self
    }

    /// Fail `read_image` for any path containing `needle`.
    pub fn failing_read_on(mut self, needle: &str) -> Self {
        self.fail_read_on = Some(needle.to_string());
        self
    }

    /// Fail `add_image` for any image whose path contains `needle`.
    pub fn failing_add_on(mut self, needle: &str) -> Self {
        self.fail_add_on = Some(needle.to_string());
        self
    }

    /// Fail `finalize_template` for templates holding exactly `images` images.
    pub fn failing_finalize_with_images(mut self, images: usize) -> Self {
        self.fail_finalize_with_images = Some(images);
        self
    }

    pub fn failing_verify(mut self) -> Self {
        self.fail_verify = true;
        self
    }

    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Algorithm name passed to `initialize`, until `shutdown`.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Every path passed to `read_image`, in call order.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub fn verifies(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }

    /// Expected score of a template with `a` images against one with `b`.
    pub fn score(a: usize, b: usize) -> f32 {
        (10 * a + b) as f32
    }

    fn image_count(buffer: &[u8]) -> Result<usize> {
        let bytes: [u8; 4] = buffer
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| JanusError::Parse("fake template too short".into()))?;
        Ok(u32::from_le_bytes(bytes) as usize)
    }
}

fn contains(path: &Path, needle: &Option<String>) -> bool {
    needle
        .as_deref()
        .is_some_and(|n| path.to_string_lossy().contains(n))
}

impl TemplateSdk for FakeSdk {
    type Image = FakeImage;
    type Template = FakeTemplate;

    fn initialize(&mut self, _sdk_path: &Path, _temp_path: &Path, algorithm: &str) -> Result<()> {
        self.session = Some(algorithm.to_string());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.fail_shutdown {
            return Err(JanusError::Unknown("shutdown".into()));
        }
        self.session = None;
        Ok(())
    }

    fn max_template_size(&self) -> usize {
        self.max_size
    }

    fn read_image(&self, path: &Path) -> Result<FakeImage> {
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(path.to_path_buf());
        }
        if contains(path, &self.fail_read_on) {
            return Err(JanusError::InvalidImage(path.display().to_string()));
        }
        Ok(FakeImage {
            path: path.to_path_buf(),
        })
    }

    fn free_image(&self, image: FakeImage) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        drop(image);
    }

    fn initialize_template(&self) -> Result<FakeTemplate> {
        if self.fail_initialize_template {
            return Err(JanusError::Unknown("initialize_template".into()));
        }
        Ok(FakeTemplate::default())
    }

    fn add_image(
        &self,
        image: &FakeImage,
        attributes: &AttributeList,
        template: &mut FakeTemplate,
    ) -> Result<()> {
        if contains(&image.path, &self.fail_add_on) {
            return Err(JanusError::InvalidImage(image.path.display().to_string()));
        }
        template.images.push(image.path.clone());
        template.attribute_sum += attributes.values().iter().sum::<f32>();
        Ok(())
    }

    fn finalize_template(&self, template: FakeTemplate, buffer: &mut [u8]) -> Result<usize> {
        if self.fail_finalize_with_images == Some(template.images.len()) {
            return Err(JanusError::Unknown("finalize_template".into()));
        }
        if buffer.len() < Self::TEMPLATE_LEN {
            return Err(JanusError::OutOfMemory(Self::TEMPLATE_LEN));
        }
        buffer[..4].copy_from_slice(&(template.images.len() as u32).to_le_bytes());
        buffer[4..8].copy_from_slice(&template.attribute_sum.to_le_bytes());
        Ok(Self::TEMPLATE_LEN)
    }

    fn verify(&self, a: &[u8], b: &[u8]) -> Result<f32> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        if self.fail_verify {
            return Err(JanusError::Unknown("verify".into()));
        }
        Ok(Self::score(Self::image_count(a)?, Self::image_count(b)?))
    }
}

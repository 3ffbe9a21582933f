//! Enrollment iterator and the driving modes built on it.
//!
//! Consecutive metadata rows with the same `Template_ID` form one template.
//! Only one subject's images are decoded at a time.

use crate::error::{JanusError, Result};
use crate::gallery::Gallery;
use crate::metadata::{Metadata, MetadataRow};
use crate::metrics::{Metrics, Stage};
use crate::sdk::TemplateSdk;
use crate::template::FlatTemplate;
use crate::types::TemplateId;
use std::io::Write;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

/// Single-pass cursor over a metadata table, yielding one in-progress
/// template per run of equal `Template_ID`s.
///
/// Adjacency defines a group: ids `[1, 1, 2, 2, 1]` yield three templates.
/// The cursor cannot be rewound, and after any error it yields nothing more.
pub struct TemplateIterator<'a, S: TemplateSdk> {
    sdk: &'a S,
    metrics: &'a Metrics,
    rows: Vec<MetadataRow>,
    position: usize,
    prefix: Option<PathBuf>,
    verbose: bool,
    finished: bool,
}

impl<'a, S: TemplateSdk> TemplateIterator<'a, S> {
    /// `prefix`, when given, is joined in front of every `File_Name`.
    pub fn new(
        sdk: &'a S,
        metadata: Metadata,
        prefix: Option<&Path>,
        verbose: bool,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            sdk,
            metrics,
            rows: metadata.rows,
            position: 0,
            prefix: prefix.map(Path::to_path_buf),
            verbose,
            finished: false,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows_consumed(&self) -> usize {
        self.position
    }

    /// Enroll the next subject's images into a fresh template.
    ///
    /// Returns `Ok(None)` once every row is consumed. Any SDK failure ends
    /// the pass; the partially augmented template is discarded.
    pub fn next_template(&mut self) -> Result<Option<(TemplateId, S::Template)>> {
        if self.finished || self.position >= self.rows.len() {
            if !self.finished && self.verbose {
                eprintln!();
            }
            self.finished = true;
            return Ok(None);
        }

        match self.enroll_group() {
            Ok(group) => {
                if self.verbose {
                    eprint!("\rEnrolling {}/{}", self.position, self.rows.len());
                    let _ = std::io::stderr().flush();
                }
                Ok(Some(group))
            }
            Err(e) => {
                self.finished = true;
                tracing::warn!(row = self.position, error = %e, "enrollment aborted");
                Err(e)
            }
        }
    }

    fn enroll_group(&mut self) -> Result<(TemplateId, S::Template)> {
        let sdk = self.sdk;
        let metrics = self.metrics;
        let id = self.rows[self.position].template_id;
        let start = self.position;

        let mut template = metrics.time(Stage::InitializeTemplate, || sdk.initialize_template())?;

        while let Some(row) = self.rows.get(self.position) {
            if row.template_id != id {
                break;
            }
            let path = self.image_path(&row.file_name);
            let image = metrics.time(Stage::ReadImage, || sdk.read_image(&path))?;
            let attributes = row.attribute_list();
            let added = metrics.time(Stage::AddImage, || {
                sdk.add_image(&image, &attributes, &mut template)
            });
            metrics.time(Stage::FreeImage, || sdk.free_image(image));
            added?;
            self.position += 1;
        }

        tracing::debug!(template_id = id, images = self.position - start, "template enrolled");
        Ok((id, template))
    }

    fn image_path(&self, file_name: &str) -> PathBuf {
        match &self.prefix {
            Some(prefix) => prefix.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

impl<S: TemplateSdk> Iterator for TemplateIterator<'_, S> {
    type Item = Result<(TemplateId, S::Template)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_template().transpose()
    }
}

impl<S: TemplateSdk> FusedIterator for TemplateIterator<'_, S> {}

/// Finalized templates of one metadata table, in subject order.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub ids: Vec<TemplateId>,
    pub templates: Vec<FlatTemplate>,
}

impl TemplateSet {
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn push(&mut self, id: TemplateId, template: FlatTemplate) {
        self.ids.push(id);
        self.templates.push(template);
    }
}

/// Enroll a table whose rows all describe one subject into a single template.
///
/// Fails with `TemplateIdMismatch` if the rows carry more than one id. A
/// header-only table finalizes an empty template and yields no id. A
/// finalize failure is returned here rather than stored.
pub fn enroll_template<S: TemplateSdk>(
    sdk: &S,
    metadata: Metadata,
    prefix: Option<&Path>,
    metrics: &Metrics,
) -> Result<(Option<TemplateId>, FlatTemplate)> {
    let id = metadata.rows.first().map(|row| row.template_id);
    if metadata.rows.iter().any(|row| Some(row.template_id) != id) {
        return Err(JanusError::TemplateIdMismatch);
    }

    let mut templates = TemplateIterator::new(sdk, metadata, prefix, false, metrics);
    let template = match templates.next_template()? {
        Some((_, template)) => template,
        None => metrics.time(Stage::InitializeTemplate, || sdk.initialize_template())?,
    };

    let flat = FlatTemplate::finalize(sdk, template, metrics);
    flat.data()?;
    Ok((id, flat))
}

/// Enroll and finalize every subject of a table.
///
/// Finalize failures are stored in the returned templates; read and augment
/// failures abort the pass.
pub fn enroll_all<S: TemplateSdk>(
    sdk: &S,
    metadata: Metadata,
    prefix: Option<&Path>,
    verbose: bool,
    metrics: &Metrics,
) -> Result<TemplateSet> {
    let mut set = TemplateSet::default();
    for group in TemplateIterator::new(sdk, metadata, prefix, verbose, metrics) {
        let (id, template) = group?;
        set.push(id, FlatTemplate::finalize(sdk, template, metrics));
    }
    Ok(set)
}

/// Enroll every subject of a table into `gallery`, returning the template count.
pub fn enroll_gallery<S: TemplateSdk, G: Gallery>(
    sdk: &S,
    metadata: Metadata,
    prefix: Option<&Path>,
    verbose: bool,
    gallery: &mut G,
    metrics: &Metrics,
) -> Result<usize> {
    let mut count = 0;
    for group in TemplateIterator::new(sdk, metadata, prefix, verbose, metrics) {
        let (id, template) = group?;
        let flat = FlatTemplate::finalize(sdk, template, metrics);
        gallery.enroll(&flat, id)?;
        count += 1;
    }
    tracing::info!(templates = count, "gallery enrolled");
    Ok(count)
}

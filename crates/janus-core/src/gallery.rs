//! Gallery collaborator: the destination of a full enrollment pass.

use crate::error::Result;
use crate::template::FlatTemplate;
use crate::types::TemplateId;

/// A collection that finalized templates are enrolled into.
pub trait Gallery {
    /// Add `template` under `id`. Templates carrying a finalize error must be rejected.
    fn enroll(&mut self, template: &FlatTemplate, id: TemplateId) -> Result<()>;
}

/// Ordered in-memory gallery.
#[derive(Debug, Clone, Default)]
pub struct MemoryGallery {
    entries: Vec<(TemplateId, FlatTemplate)>,
}

impl MemoryGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}

impl Gallery for MemoryGallery {
    fn enroll(&mut self, template: &FlatTemplate, id: TemplateId) -> Result<()> {
        template.data()?;
        self.entries.push((id, template.clone()));
        Ok(())
    }
}

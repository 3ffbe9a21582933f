//! Metadata table reader.
//!
//! A metadata table is comma-delimited text. The header names a
//! `Template_ID` column, a `File_Name` column, and any number of attribute
//! columns; each following line describes one image.

use crate::error::{JanusError, Result};
use crate::types::{Attribute, AttributeList, TemplateId};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const DELIMITER: char = ',';
const TEMPLATE_ID_COLUMN: &str = "Template_ID";
const FILE_NAME_COLUMN: &str = "File_Name";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// One image row of a metadata table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub template_id: TemplateId,
    pub file_name: String,
    /// Declared attribute columns in header order; `None` for an empty field.
    pub values: Vec<(Attribute, Option<f32>)>,
}

impl MetadataRow {
    /// Attributes with a value present, in column order.
    pub fn attribute_list(&self) -> AttributeList {
        let mut list = AttributeList::new();
        for &(attribute, value) in &self.values {
            if let Some(v) = value {
                list.push(attribute, v);
            }
        }
        list
    }
}

/// A parsed metadata table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Attribute kind of every non-id, non-filename column, in header order.
    pub attributes: Vec<Attribute>,
    pub rows: Vec<MetadataRow>,
}

impl Metadata {
    /// Read and parse a metadata table from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| JanusError::Open(format!("{}: {e}", path.display())))?;
        let metadata = Self::parse(BufReader::new(file), &path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            rows = metadata.rows.len(),
            attributes = metadata.attributes.len(),
            "metadata loaded"
        );
        Ok(metadata)
    }

    /// Parse a metadata table. `source` names the input in error messages.
    pub fn parse<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|e| JanusError::Read(format!("{source}: {e}")))?,
            None => String::new(),
        };
        let header = strip_cr(&header);
        let header = header.strip_prefix(BYTE_ORDER_MARK).unwrap_or(header);
        let columns = Columns::from_header(header, source)?;

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let line = line.map_err(|e| JanusError::Read(format!("{source}: {e}")))?;
            let line = strip_cr(&line);
            if line.trim().is_empty() {
                continue;
            }
            // Header is line 1.
            rows.push(columns.parse_row(line, source, index + 2)?);
        }

        Ok(Self {
            attributes: columns.attributes,
            rows,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One id per run of consecutive rows sharing a `Template_ID`.
    ///
    /// Matches the grouping of [`TemplateIterator`](crate::enroll::TemplateIterator):
    /// `[1, 1, 2, 2, 1]` collapses to `[1, 2, 1]`.
    pub fn subject_ids(&self) -> Vec<TemplateId> {
        let mut ids: Vec<TemplateId> = self.rows.iter().map(|r| r.template_id).collect();
        ids.dedup();
        ids
    }
}

/// Column layout resolved from the header line.
struct Columns {
    template_id: usize,
    file_name: usize,
    width: usize,
    attributes: Vec<Attribute>,
}

impl Columns {
    fn from_header(header: &str, source: &str) -> Result<Self> {
        let mut template_id = None;
        let mut file_name = None;
        let mut attributes = Vec::new();
        let mut width = 0;

        for (i, name) in header.split(DELIMITER).enumerate() {
            width += 1;
            match name {
                TEMPLATE_ID_COLUMN => {
                    if template_id.replace(i).is_some() {
                        return Err(JanusError::Parse(format!(
                            "{source}: duplicate {TEMPLATE_ID_COLUMN} column"
                        )));
                    }
                }
                FILE_NAME_COLUMN => {
                    if file_name.replace(i).is_some() {
                        return Err(JanusError::Parse(format!(
                            "{source}: duplicate {FILE_NAME_COLUMN} column"
                        )));
                    }
                }
                other => attributes.push(Attribute::from_column(other)),
            }
        }

        let template_id = template_id.ok_or(JanusError::MissingTemplateId)?;
        let file_name = file_name.ok_or(JanusError::MissingFileName)?;

        Ok(Self {
            template_id,
            file_name,
            width,
            attributes,
        })
    }

    fn parse_row(&self, line: &str, source: &str, line_no: usize) -> Result<MetadataRow> {
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() != self.width {
            return Err(JanusError::Parse(format!(
                "{source}:{line_no}: expected {} fields, got {}",
                self.width,
                fields.len()
            )));
        }

        let template_id = fields[self.template_id].trim().parse().map_err(|_| {
            JanusError::Parse(format!(
                "{source}:{line_no}: invalid {TEMPLATE_ID_COLUMN} {:?}",
                fields[self.template_id]
            ))
        })?;

        let mut values = Vec::with_capacity(self.attributes.len());
        let value_fields = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.template_id && *i != self.file_name)
            .map(|(_, field)| field.trim());
        for (&attribute, field) in self.attributes.iter().zip(value_fields) {
            let value = if field.is_empty() {
                None
            } else {
                Some(field.parse::<f32>().map_err(|_| {
                    JanusError::Parse(format!("{source}:{line_no}: invalid value {field:?}"))
                })?)
            };
            values.push((attribute, value));
        }

        Ok(MetadataRow {
            template_id,
            file_name: fields[self.file_name].to_string(),
            values,
        })
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

//! Similarity and mask matrix generation.
//!
//! Both matrices are query-major: row `i` is query subject `i`, column `j`
//! is target subject `j`. Files use the `S2` layout: three text lines, a
//! fourth line carrying payload kind, shape and a native-endian marker, then
//! the dense payload.

use crate::enroll::enroll_all;
use crate::error::{JanusError, Result};
use crate::metadata::Metadata;
use crate::metrics::Metrics;
use crate::sdk::TemplateSdk;
use crate::template::FlatTemplate;
use crate::types::TemplateId;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Mask value for a query/target pair sharing a subject.
pub const MASK_MATCH: u8 = 0xFF;
/// Mask value for a query/target pair of different subjects.
pub const MASK_NON_MATCH: u8 = 0x7F;

const FORMAT_TAG: &str = "S2";
const ENDIAN_MARKER: u32 = 0x1234_5678;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// One byte per cell, [`MASK_MATCH`] or [`MASK_NON_MATCH`].
    Mask,
    /// One native-endian `f32` per cell.
    Similarity,
}

impl PayloadKind {
    pub fn code(self) -> char {
        match self {
            PayloadKind::Mask => 'B',
            PayloadKind::Similarity => 'F',
        }
    }

    pub fn element_size(self) -> usize {
        match self {
            PayloadKind::Mask => 1,
            PayloadKind::Similarity => std::mem::size_of::<f32>(),
        }
    }
}

/// Text header of a matrix file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixHeader {
    pub target: String,
    pub query: String,
    pub kind: PayloadKind,
    pub rows: usize,
    pub columns: usize,
}

impl MatrixHeader {
    pub fn payload_len(&self) -> usize {
        self.rows * self.columns * self.kind.element_size()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "{FORMAT_TAG}\n{}\n{}\nM{} {} {} ",
            self.target,
            self.query,
            self.kind.code(),
            self.rows,
            self.columns
        )
        .into_bytes();
        out.extend_from_slice(&ENDIAN_MARKER.to_ne_bytes());
        out.push(b'\n');
        out
    }
}

/// Write `header` followed by `payload`, which must be exactly `payload_len` bytes.
pub fn write_matrix<W: Write>(out: &mut W, header: &MatrixHeader, payload: &[u8]) -> Result<()> {
    if payload.len() != header.payload_len() {
        return Err(JanusError::Unknown(format!(
            "matrix payload is {} bytes, header expects {}",
            payload.len(),
            header.payload_len()
        )));
    }
    let write_err = |e: std::io::Error| JanusError::Write(format!("matrix: {e}"));
    out.write_all(&header.to_bytes()).map_err(write_err)?;
    out.write_all(payload).map_err(write_err)?;
    out.flush().map_err(write_err)
}

/// Score every query against every target:
/// `scores[i * targets + j] = compare(query[i], target[j])`.
///
/// The first failure, stored or from the SDK, aborts the whole matrix.
pub fn similarity_matrix<S: TemplateSdk>(
    query: &[FlatTemplate],
    target: &[FlatTemplate],
    sdk: &S,
    verbose: bool,
    metrics: &Metrics,
) -> Result<Vec<f32>> {
    let mut scores = Vec::with_capacity(query.len() * target.len());
    for (i, q) in query.iter().enumerate() {
        for t in target {
            scores.push(q.compare(t, sdk, metrics)?);
        }
        if verbose {
            eprint!("\rComparing {}/{}", i + 1, query.len());
            let _ = std::io::stderr().flush();
        }
    }
    if verbose && !query.is_empty() {
        eprintln!();
    }
    Ok(scores)
}

/// Ground truth for every query/target pair of subject ids.
pub fn mask_matrix(query_ids: &[TemplateId], target_ids: &[TemplateId]) -> Vec<u8> {
    query_ids
        .iter()
        .flat_map(|q| {
            target_ids
                .iter()
                .map(move |t| if q == t { MASK_MATCH } else { MASK_NON_MATCH })
        })
        .collect()
}

pub fn write_similarity<W: Write>(
    out: &mut W,
    target_name: &str,
    query_name: &str,
    rows: usize,
    columns: usize,
    scores: &[f32],
) -> Result<()> {
    let header = MatrixHeader {
        target: target_name.to_string(),
        query: query_name.to_string(),
        kind: PayloadKind::Similarity,
        rows,
        columns,
    };
    let payload: Vec<u8> = scores.iter().flat_map(|s| s.to_ne_bytes()).collect();
    write_matrix(out, &header, &payload)
}

pub fn write_mask<W: Write>(
    out: &mut W,
    target_name: &str,
    query_name: &str,
    rows: usize,
    columns: usize,
    mask: &[u8],
) -> Result<()> {
    let header = MatrixHeader {
        target: target_name.to_string(),
        query: query_name.to_string(),
        kind: PayloadKind::Mask,
        rows,
        columns,
    };
    write_matrix(out, &header, mask)
}

/// Enroll both tables, score query against target and write the simmat file.
///
/// Nothing is written unless enrollment and every comparison succeed.
pub fn create_simmat<S: TemplateSdk>(
    sdk: &S,
    target_metadata: &Path,
    query_metadata: &Path,
    output: &Path,
    prefix: Option<&Path>,
    verbose: bool,
    metrics: &Metrics,
) -> Result<()> {
    let target_rows = Metadata::read(target_metadata)?;
    let query_rows = Metadata::read(query_metadata)?;

    let targets = enroll_all(sdk, target_rows, prefix, verbose, metrics)?;
    let queries = enroll_all(sdk, query_rows, prefix, verbose, metrics)?;

    let scores = similarity_matrix(&queries.templates, &targets.templates, sdk, verbose, metrics)?;

    let mut out = create_output(output)?;
    write_similarity(
        &mut out,
        &target_metadata.display().to_string(),
        &query_metadata.display().to_string(),
        queries.len(),
        targets.len(),
        &scores,
    )?;
    tracing::info!(
        path = %output.display(),
        rows = queries.len(),
        columns = targets.len(),
        "similarity matrix written"
    );
    Ok(())
}

/// Compare the subject ids of both tables and write the mask file.
pub fn create_mask(target_metadata: &Path, query_metadata: &Path, output: &Path) -> Result<()> {
    let target_ids = Metadata::read(target_metadata)?.subject_ids();
    let query_ids = Metadata::read(query_metadata)?.subject_ids();

    let mask = mask_matrix(&query_ids, &target_ids);

    let mut out = create_output(output)?;
    write_mask(
        &mut out,
        &target_metadata.display().to_string(),
        &query_metadata.display().to_string(),
        query_ids.len(),
        target_ids.len(),
        &mask,
    )?;
    tracing::info!(
        path = %output.display(),
        rows = query_ids.len(),
        columns = target_ids.len(),
        "mask matrix written"
    );
    Ok(())
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| JanusError::Write(format!("{}: {e}", path.display())))
}

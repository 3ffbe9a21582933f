//! Error kinds shared by every harness stage.

use thiserror::Error;

/// Result alias for janus operations.
pub type Result<T> = std::result::Result<T, JanusError>;

/// One error kind per failure class a harness stage can report.
///
/// The type is `Clone` so a finalized template can hold on to its
/// finalize failure and hand it back each time it is used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JanusError {
    #[error("failed to open {0}")]
    Open(String),
    #[error("failed to read {0}")]
    Read(String),
    #[error("failed to write {0}")]
    Write(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid video: {0}")]
    InvalidVideo(String),
    #[error("metadata header has no Template_ID column")]
    MissingTemplateId,
    #[error("metadata header has no File_Name column")]
    MissingFileName,
    #[error("attribute list is missing")]
    NullAttributeList,
    #[error("metadata rows do not share one Template_ID")]
    TemplateIdMismatch,
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),
    #[error("invalid SDK path: {0}")]
    InvalidSdkPath(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

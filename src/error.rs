//! Error taxonomy for the upload wizard and driver.
//!
//! Validation failures block a wizard transition and are always recoverable by
//! the user. Upload failures reset the current queue position for a retry,
//! except `Precondition`, which marks a broken internal contract and aborts
//! the session.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub const MAX_NAME_LEN: usize = 20;
pub const MAX_RESOURCES_NAME_LEN: usize = 30;
pub const MAX_SELECTIONS: usize = 3;

/// A wizard step gate refused to advance. The offending field must be
/// corrected and the step resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill in your name")]
    MissingName,
    #[error("name may contain letters only")]
    NameNotLetters,
    #[error("name cannot exceed {MAX_NAME_LEN} characters")]
    NameTooLong,
    #[error("please select a branch")]
    BranchNotSelected,
    #[error("please select a SEM")]
    SemNotSelected,
    #[error("please enter the subject name")]
    MissingSubjectName,
    #[error("please enter the resources name")]
    MissingResourcesName,
    #[error("resources name may contain only letters, digits, spaces, '.', '_' and '-'")]
    InvalidResourcesName,
    #[error("resources name cannot exceed {MAX_RESOURCES_NAME_LEN} characters")]
    ResourcesNameTooLong,
    #[error("please select at least one file type to upload")]
    NoArtifactSelected,
    #[error("a maximum of {MAX_SELECTIONS} file types may be selected, got {0}")]
    TooManySelections(usize),
    #[error("this step is not currently open for input")]
    StepNotOpen,
}

/// A failure while processing the current queue item. All variants except
/// `Precondition` leave the cursor in place for a user-initiated retry.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("only PDF files are allowed, got '{mime_type}'")]
    WrongType { mime_type: String },
    #[error("error reading {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("an error occurred during upload: {0}")]
    Network(String),
    #[error("internal contract violated: {0}")]
    Precondition(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::WrongType { .. } => ErrorKind::WrongType,
            UploadError::Read { .. } => ErrorKind::Read,
            UploadError::Network(_) => ErrorKind::Network,
            UploadError::Precondition(_) => ErrorKind::Precondition,
        }
    }
}

/// Coarse error class carried on `ItemFailed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    WrongType,
    Read,
    Network,
    Precondition,
}

//! Canonical upload filename generation.
//!
//! Assumes already-validated `UserDetails`; a missing subject or resources
//! name for an artifact that needs one is a broken contract, not a user error.

use crate::error::UploadError;
use crate::model::{ArtifactType, UserDetails};

/// Derive the canonical filename for one artifact:
/// `{branch}_Resources_{resourcesName}_{sem}({name})<{year}>.pdf` for
/// resources, `{branch}_{label}_{sem}({name})<{year}>.pdf` otherwise, with
/// internal spaces stripped from the label.
pub fn file_name(artifact: ArtifactType, details: &UserDetails) -> Result<String, UploadError> {
    if artifact == ArtifactType::Resources {
        let resources_name = details.resources_name.as_deref().ok_or_else(|| {
            UploadError::Precondition("resources artifact queued without a resources name".into())
        })?;
        return Ok(format!(
            "{}_Resources_{}_{}({})<{}>.pdf",
            details.branch, resources_name, details.sem, details.name, details.year
        ));
    }

    let label = match artifact {
        ArtifactType::Subject => details
            .subject_name
            .as_deref()
            .ok_or_else(|| {
                UploadError::Precondition("subject artifact queued without a subject name".into())
            })?
            .replace(' ', ""),
        ArtifactType::Ese => "ESE".to_string(),
        ArtifactType::Ise1 => "ISE1".to_string(),
        ArtifactType::Ise2 => "ISE2".to_string(),
        ArtifactType::Combined => "COMBINED".to_string(),
        ArtifactType::Resources => unreachable!(),
    };

    Ok(format!(
        "{}_{}_{}({})<{}>.pdf",
        details.branch, label, details.sem, details.name, details.year
    ))
}

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;

/// Branches whose papers the portal accepts. The string form is used verbatim
/// in upload filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Branch {
    Cse,
    It,
    Extc,
    Mech,
    Civil,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Cse => "CSE",
            Branch::It => "IT",
            Branch::Extc => "EXTC",
            Branch::Mech => "MECH",
            Branch::Civil => "CIVIL",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of uploadable artifact types. An artifact type appears at
/// most once per session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
pub enum ArtifactType {
    Resources,
    Subject,
    Ese,
    Ise1,
    Ise2,
    Combined,
}

/// Fixed priority order in which selected artifacts are uploaded.
pub const CANONICAL_ORDER: [ArtifactType; 6] = [
    ArtifactType::Resources,
    ArtifactType::Subject,
    ArtifactType::Ese,
    ArtifactType::Ise1,
    ArtifactType::Ise2,
    ArtifactType::Combined,
];

impl ArtifactType {
    /// Selection token, matching the upload form's checkbox ids.
    pub fn token(self) -> &'static str {
        match self {
            ArtifactType::Resources => "resources",
            ArtifactType::Subject => "subject",
            ArtifactType::Ese => "ESE",
            ArtifactType::Ise1 => "ISE1",
            ArtifactType::Ise2 => "ISE2",
            ArtifactType::Combined => "COMBINED",
        }
    }

    /// Human-readable label for prompts and confirmations. Subject and
    /// resources artifacts carry the user-supplied name so consecutive
    /// prompts stay distinguishable.
    pub fn prompt_label(self, details: &UserDetails) -> String {
        match self {
            ArtifactType::Subject => {
                let name = details.subject_name.as_deref().unwrap_or("?");
                format!("Subject ({name})")
            }
            ArtifactType::Resources => {
                let name = details.resources_name.as_deref().unwrap_or("?");
                format!("Resources ({name})")
            }
            ArtifactType::Ise1 => "ISE 1".to_string(),
            ArtifactType::Ise2 => "ISE 2".to_string(),
            ArtifactType::Ese => "ESE".to_string(),
            ArtifactType::Combined => "COMBINED".to_string(),
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Validated uploader metadata. Built by the wizard at the Details gate,
/// completed at the Selection gate, read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    pub name: String,
    pub branch: Branch,
    pub year: String,
    pub sem: String,
    pub subject_name: Option<String>,
    pub resources_name: Option<String>,
}

/// Wire request accepted by the upload endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub base64_file: String,
    pub branch: String,
    pub sem: String,
}

/// Wire response from the upload endpoint. Anything other than
/// `status == "success"` is a failed upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Events emitted by the upload driver and consumed by presentation layers.
#[derive(Debug, Clone, Serialize)]
pub enum UploadEvent {
    /// The driver is ready for the next artifact's file.
    PromptForArtifact { artifact: ArtifactType },
    /// Simulated upload percentage for the in-flight artifact.
    Progress { artifact: ArtifactType, percent: f64 },
    /// The current artifact was uploaded and the cursor advanced.
    ItemConfirmed {
        artifact: ArtifactType,
        file_name: String,
        is_last: bool,
    },
    /// The current artifact failed; the same queue position will be retried.
    ItemFailed {
        artifact: ArtifactType,
        kind: ErrorKind,
        message: String,
    },
    /// Every queued artifact was confirmed. Emitted exactly once.
    AllComplete,
}

/// One confirmed upload in the session receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptItem {
    pub artifact: ArtifactType,
    pub file_name: String,
    /// Submissions consumed for this queue position, including rejected and
    /// failed ones.
    pub attempts: u32,
}

/// Summary of an upload session, exportable as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReceipt {
    pub timestamp_utc: String,
    pub branch: String,
    pub sem: String,
    pub items: Vec<ReceiptItem>,
}

impl SessionReceipt {
    pub fn new(details: &UserDetails) -> Self {
        Self {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            branch: details.branch.to_string(),
            sem: details.sem.clone(),
            items: Vec::new(),
        }
    }
}

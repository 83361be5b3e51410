//! Applicant documents: the per-applicant checklist row, its attachments and
//! the upload rules shared by the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extensions accepted for document uploads, lowercase with the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 6] = [".pdf", ".doc", ".docx", ".jpg", ".jpeg", ".png"];

/// Default upload size cap: 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Id,
    Certificate,
    Residence,
    Payment,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Id,
        DocumentType::Certificate,
        DocumentType::Residence,
        DocumentType::Payment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Id => "id",
            DocumentType::Certificate => "certificate",
            DocumentType::Residence => "residence",
            DocumentType::Payment => "payment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Id => "ID Document",
            DocumentType::Certificate => "Certificate",
            DocumentType::Residence => "Proof of Residence",
            DocumentType::Payment => "Proof of Payment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase();
        DocumentType::ALL.into_iter().find(|t| t.as_str() == key)
    }

    pub fn uploaded_column(self) -> &'static str {
        match self {
            DocumentType::Id => "id_uploaded",
            DocumentType::Certificate => "certificate_uploaded",
            DocumentType::Residence => "residence_uploaded",
            DocumentType::Payment => "payment_uploaded",
        }
    }

    pub fn verified_column(self) -> &'static str {
        match self {
            DocumentType::Id => "id_verified",
            DocumentType::Certificate => "certificate_verified",
            DocumentType::Residence => "residence_verified",
            DocumentType::Payment => "payment_verified",
        }
    }
}

/// Aggregate status of a `DocumentRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// At least one required document is missing.
    #[default]
    Pending,
    /// Everything uploaded, verification outstanding.
    Submitted,
    /// Every document verified.
    Approved,
}

/// A row of the `documents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub id_uploaded: bool,
    pub id_verified: bool,
    pub certificate_uploaded: bool,
    pub certificate_verified: bool,
    pub residence_uploaded: bool,
    pub residence_verified: bool,
    pub payment_uploaded: bool,
    pub payment_verified: bool,
    pub status: DocumentStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            id_uploaded: false,
            id_verified: false,
            certificate_uploaded: false,
            certificate_verified: false,
            residence_uploaded: false,
            residence_verified: false,
            payment_uploaded: false,
            payment_verified: false,
            status: DocumentStatus::Pending,
            updated_at: None,
        }
    }

    pub fn uploaded(&self, doc_type: DocumentType) -> bool {
        match doc_type {
            DocumentType::Id => self.id_uploaded,
            DocumentType::Certificate => self.certificate_uploaded,
            DocumentType::Residence => self.residence_uploaded,
            DocumentType::Payment => self.payment_uploaded,
        }
    }

    pub fn verified(&self, doc_type: DocumentType) -> bool {
        match doc_type {
            DocumentType::Id => self.id_verified,
            DocumentType::Certificate => self.certificate_verified,
            DocumentType::Residence => self.residence_verified,
            DocumentType::Payment => self.payment_verified,
        }
    }

    pub fn set_uploaded(&mut self, doc_type: DocumentType, value: bool) {
        match doc_type {
            DocumentType::Id => self.id_uploaded = value,
            DocumentType::Certificate => self.certificate_uploaded = value,
            DocumentType::Residence => self.residence_uploaded = value,
            DocumentType::Payment => self.payment_uploaded = value,
        }
    }

    pub fn set_verified(&mut self, doc_type: DocumentType, value: bool) {
        match doc_type {
            DocumentType::Id => self.id_verified = value,
            DocumentType::Certificate => self.certificate_verified = value,
            DocumentType::Residence => self.residence_verified = value,
            DocumentType::Payment => self.payment_verified = value,
        }
    }

    /// The aggregate status implied by the flags.
    pub fn derived_status(&self) -> DocumentStatus {
        if DocumentType::ALL.iter().all(|t| self.verified(*t)) {
            DocumentStatus::Approved
        } else if DocumentType::ALL.iter().all(|t| self.uploaded(*t)) {
            DocumentStatus::Submitted
        } else {
            DocumentStatus::Pending
        }
    }

    pub fn checklist(&self) -> Vec<DocumentCheck> {
        DocumentType::ALL
            .into_iter()
            .map(|doc_type| DocumentCheck {
                doc_type,
                label: doc_type.label().to_string(),
                uploaded: self.uploaded(doc_type),
                verified: self.verified(doc_type),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCheck {
    pub doc_type: DocumentType,
    pub label: String,
    pub uploaded: bool,
    pub verified: bool,
}

/// A row of the `attachments` table. `url` is not stored; it is derived when
/// the attachment is listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    pub document_id: String,
    pub doc_type: DocumentType,
    pub file_path: String,
    pub file_type: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub md5: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Documents of one applicant as returned to the student or the reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOverview {
    pub record: DocumentRecord,
    pub checklist: Vec<DocumentCheck>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Invalid file type.")]
    InvalidType,
    #[error("File too large. Max {max_mb}MB.")]
    TooLarge { max_mb: u64 },
}

/// Extension of `file_name` (lowercase, leading dot) when it is allow-listed.
pub fn allowed_extension(file_name: &str) -> Result<String, UploadRejection> {
    let extension = file_name
        .rfind('.')
        .map(|pos| file_name[pos..].to_ascii_lowercase())
        .ok_or(UploadRejection::InvalidType)?;
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(UploadRejection::InvalidType)
    }
}

/// Checks a prospective upload against the extension allow-list and the size cap.
pub fn validate_upload(
    file_name: &str,
    size: u64,
    max_bytes: u64,
) -> Result<String, UploadRejection> {
    let extension = allowed_extension(file_name)?;
    if size > max_bytes {
        return Err(UploadRejection::TooLarge {
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(extension)
}

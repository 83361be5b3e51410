//! Application progress checklist.
//!
//! Every registration owns one `ProgressRecord` with four independently
//! settable steps. The first three steps form the checklist and share the
//! `ChecklistStatus` vocabulary; the review step has its own `ReviewStatus`
//! vocabulary because its terminal value is `approved` rather than `complete`.
//!
//! Older rows may carry status strings from earlier schema revisions
//! (`completed`, `reset`, `in progress`, ...). They are read through
//! `LEGACY_STATUS_TABLE`; writes always use the canonical values returned by
//! `as_str`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("unknown progress step `{0}`")]
    UnknownStep(String),
    #[error("`{value}` is not a valid status for {step}")]
    InvalidStatus { step: Step, value: String },
}

/// One of the four tracked steps of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ApplicationSubmitted,
    DocumentUploaded,
    PaymentVerified,
    ApplicationReview,
}

impl Step {
    /// Steps that must be complete before the review can be approved.
    pub const CHECKLIST: [Step; 3] = [
        Step::ApplicationSubmitted,
        Step::DocumentUploaded,
        Step::PaymentVerified,
    ];

    pub const ALL: [Step; 4] = [
        Step::ApplicationSubmitted,
        Step::DocumentUploaded,
        Step::PaymentVerified,
        Step::ApplicationReview,
    ];

    /// Column holding the status in `progress_management`.
    pub fn column(self) -> &'static str {
        match self {
            Step::ApplicationSubmitted => "application_submitted",
            Step::DocumentUploaded => "document_uploaded",
            Step::PaymentVerified => "payment_verified",
            Step::ApplicationReview => "application_review",
        }
    }

    /// Column holding the time of the last write to this step.
    pub fn updated_at_column(self) -> &'static str {
        match self {
            Step::ApplicationSubmitted => "application_submitted_updated_at",
            Step::DocumentUploaded => "document_uploaded_updated_at",
            Step::PaymentVerified => "payment_verified_updated_at",
            Step::ApplicationReview => "application_review_updated_at",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::ApplicationSubmitted => "Application Submitted",
            Step::DocumentUploaded => "Document Uploaded",
            Step::PaymentVerified => "Payment Verified",
            Step::ApplicationReview => "Application Review",
        }
    }

    /// Parses a step from its column name; dashes are accepted in place of underscores.
    pub fn parse(value: &str) -> Result<Step, StatusError> {
        let key = value.trim().to_ascii_lowercase().replace('-', "_");
        Step::ALL
            .into_iter()
            .find(|step| step.column() == key)
            .ok_or_else(|| StatusError::UnknownStep(value.to_string()))
    }

    /// Parses a canonical status value using the vocabulary of this step.
    pub fn parse_status(self, value: &str) -> Result<StepValue, StatusError> {
        let invalid = || StatusError::InvalidStatus {
            step: self,
            value: value.to_string(),
        };
        match self {
            Step::ApplicationReview => ReviewStatus::from_canonical(value)
                .map(StepValue::Review)
                .ok_or_else(invalid),
            _ => ChecklistStatus::from_canonical(value)
                .map(StepValue::Checklist)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of the three checklist steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Rejected,
}

/// Status of the final review step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    InProgress,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stored {
    Pending,
    InProgress,
    Done,
    Rejected,
}

/// Every status string ever written by any schema revision, mapped onto the
/// canonical vocabulary. Keys are compared after trimming and lowercasing.
const LEGACY_STATUS_TABLE: &[(&str, Stored)] = &[
    ("", Stored::Pending),
    ("pending", Stored::Pending),
    ("reset", Stored::Pending),
    ("in_progress", Stored::InProgress),
    ("in progress", Stored::InProgress),
    ("in-progress", Stored::InProgress),
    ("inprogress", Stored::InProgress),
    ("complete", Stored::Done),
    ("completed", Stored::Done),
    ("approved", Stored::Done),
    ("done", Stored::Done),
    ("rejected", Stored::Rejected),
    ("declined", Stored::Rejected),
];

fn lookup_stored(value: &str) -> Option<Stored> {
    let key = value.trim().to_ascii_lowercase();
    LEGACY_STATUS_TABLE
        .iter()
        .find(|(stored, _)| *stored == key)
        .map(|(_, status)| *status)
}

impl ChecklistStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistStatus::Pending => "pending",
            ChecklistStatus::InProgress => "in_progress",
            ChecklistStatus::Complete => "complete",
            ChecklistStatus::Rejected => "rejected",
        }
    }

    /// Strict parse of the canonical value, used for incoming writes.
    pub fn from_canonical(value: &str) -> Option<Self> {
        [
            ChecklistStatus::Pending,
            ChecklistStatus::InProgress,
            ChecklistStatus::Complete,
            ChecklistStatus::Rejected,
        ]
        .into_iter()
        .find(|status| status.as_str() == value)
    }

    /// Lenient parse of a stored value, accepting every legacy spelling.
    pub fn from_stored(value: &str) -> Option<Self> {
        lookup_stored(value).map(|stored| match stored {
            Stored::Pending => ChecklistStatus::Pending,
            Stored::InProgress => ChecklistStatus::InProgress,
            Stored::Done => ChecklistStatus::Complete,
            Stored::Rejected => ChecklistStatus::Rejected,
        })
    }
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::InProgress => "in_progress",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn from_canonical(value: &str) -> Option<Self> {
        [
            ReviewStatus::Pending,
            ReviewStatus::InProgress,
            ReviewStatus::Approved,
            ReviewStatus::Rejected,
        ]
        .into_iter()
        .find(|status| status.as_str() == value)
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        lookup_stored(value).map(|stored| match stored {
            Stored::Pending => ReviewStatus::Pending,
            Stored::InProgress => ReviewStatus::InProgress,
            Stored::Done => ReviewStatus::Approved,
            Stored::Rejected => ReviewStatus::Rejected,
        })
    }
}

/// A status value already checked against the vocabulary of its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepValue {
    Checklist(ChecklistStatus),
    Review(ReviewStatus),
}

impl StepValue {
    pub fn as_str(self) -> &'static str {
        match self {
            StepValue::Checklist(status) => status.as_str(),
            StepValue::Review(status) => status.as_str(),
        }
    }
}

/// Time of the last write to each step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTimes {
    pub application_submitted: Option<DateTime<Utc>>,
    pub document_uploaded: Option<DateTime<Utc>>,
    pub payment_verified: Option<DateTime<Utc>>,
    pub application_review: Option<DateTime<Utc>>,
}

/// Normalized view of a `progress_management` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub student_number: String,
    pub user_id: String,
    pub application_submitted: ChecklistStatus,
    pub document_uploaded: ChecklistStatus,
    pub payment_verified: ChecklistStatus,
    pub application_review: ReviewStatus,
    pub review_note: Option<String>,
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub updated: StepTimes,
}

impl ProgressRecord {
    /// A freshly submitted registration: every step pending.
    pub fn new(student_number: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            student_number: student_number.into(),
            user_id: user_id.into(),
            application_submitted: ChecklistStatus::Pending,
            document_uploaded: ChecklistStatus::Pending,
            payment_verified: ChecklistStatus::Pending,
            application_review: ReviewStatus::Pending,
            review_note: None,
            reviewed_by: None,
            updated: StepTimes::default(),
        }
    }

    pub fn checklist(&self, step: Step) -> Option<ChecklistStatus> {
        match step {
            Step::ApplicationSubmitted => Some(self.application_submitted),
            Step::DocumentUploaded => Some(self.document_uploaded),
            Step::PaymentVerified => Some(self.payment_verified),
            Step::ApplicationReview => None,
        }
    }

    /// Checklist steps that are not yet complete, in checklist order.
    pub fn missing_prerequisites(&self) -> Vec<Step> {
        Step::CHECKLIST
            .into_iter()
            .filter(|step| self.checklist(*step) != Some(ChecklistStatus::Complete))
            .collect()
    }

    pub fn ready_for_approval(&self) -> bool {
        self.missing_prerequisites().is_empty()
    }

    /// Applies an already validated value to the in-memory record.
    pub fn apply(&mut self, step: Step, value: StepValue, at: DateTime<Utc>) {
        match (step, value) {
            (Step::ApplicationSubmitted, StepValue::Checklist(s)) => {
                self.application_submitted = s;
                self.updated.application_submitted = Some(at);
            }
            (Step::DocumentUploaded, StepValue::Checklist(s)) => {
                self.document_uploaded = s;
                self.updated.document_uploaded = Some(at);
            }
            (Step::PaymentVerified, StepValue::Checklist(s)) => {
                self.payment_verified = s;
                self.updated.payment_verified = Some(at);
            }
            (Step::ApplicationReview, StepValue::Review(s)) => {
                self.application_review = s;
                self.updated.application_review = Some(at);
            }
            _ => {}
        }
    }
}

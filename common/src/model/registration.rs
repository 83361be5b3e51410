use crate::model::document::DocumentStatus;
use crate::model::progress::ProgressRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `register` table: one applicant applying for one course.
///
/// `student_number` is the natural key used by the progress workflow. It is the
/// national ID as entered, suffixed with `-2`, `-3`, ... when an earlier
/// registration already holds that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub national_id: String,
    pub student_number: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub course: String,
    pub reg_date: DateTime<Utc>,
}

impl Registration {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}

/// Registration joined with its progress record and document status, as shown
/// on the admin review table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentOverview {
    #[serde(flatten)]
    pub registration: Registration,
    pub progress: Option<ProgressRecord>,
    pub document_status: DocumentStatus,
}

//! Payloads accepted by the HTTP API.

use crate::model::attendance::{AttendanceMode, AttendanceStatus};
use crate::model::course::{CourseLevel, CourseStatus, StudyMode};
use crate::model::document::DocumentType;
use crate::model::grade::GradeFilter;
use crate::model::notification::NotificationKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub surname: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Registration form submitted by an applicant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewRegistration {
    pub national_id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub course: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// The `json` part of a document upload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadMeta {
    pub doc_type: DocumentType,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyRequest {
    pub verified: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewCourse {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub mode: StudyMode,
    #[serde(default)]
    pub level: CourseLevel,
    pub description: String,
    #[serde(default)]
    pub status: CourseStatus,
    pub opening_date: NaiveDate,
    pub closing_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseStatusRequest {
    pub status: CourseStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendNotificationRequest {
    pub recipients: Vec<String>,
    #[serde(default)]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarkAttendanceRequest {
    pub student_number: String,
    pub name: String,
    pub course: String,
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub mode: AttendanceMode,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttendanceQuery {
    /// Course name; `All` or absent means every course.
    pub course: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradeRequest {
    pub course: String,
    pub student_number: String,
    pub name: String,
    pub grade: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GradeQuery {
    pub course: String,
    /// Case-insensitive substring of the student name.
    pub search: Option<String>,
    #[serde(default)]
    pub filter: GradeFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeItemUpdate {
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentRequest {
    pub student_number: String,
    pub name: String,
    pub paid_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountQuery {
    /// Case-insensitive substring of the name or student number.
    pub search: Option<String>,
}

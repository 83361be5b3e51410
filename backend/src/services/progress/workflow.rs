//! The only code that writes `progress_management`.
//!
//! Rows are read through the legacy status table and handed out as typed
//! `ProgressRecord`s. Writes always use canonical values. Approval is a
//! compare-and-set: the update is filtered on the three checklist values that
//! were just checked, so a concurrent change in between makes it a no-op
//! instead of approving an incomplete application.

use crate::error::{ServiceError, ServiceResult};
use crate::services::notifications::{self, Outgoing};
use crate::state::AppState;
use crate::store::Table;
use chrono::{DateTime, Utc};
use common::model::notification::NotificationKind;
use common::model::progress::{
    ChecklistStatus, ProgressRecord, ReviewStatus, Step, StepTimes, StepValue,
};
use common::model::user::UserProfile;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A `progress_management` row exactly as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProgressRow {
    #[serde(default)]
    id: String,
    student_number: String,
    user_id: Option<String>,
    application_submitted: Option<String>,
    application_submitted_updated_at: Option<String>,
    document_uploaded: Option<String>,
    document_uploaded_updated_at: Option<String>,
    payment_verified: Option<String>,
    payment_verified_updated_at: Option<String>,
    application_review: Option<String>,
    application_review_updated_at: Option<String>,
    review_note: Option<String>,
    reviewed_by: Option<String>,
}

impl ProgressRow {
    fn raw(&self, step: Step) -> Option<&str> {
        match step {
            Step::ApplicationSubmitted => self.application_submitted.as_deref(),
            Step::DocumentUploaded => self.document_uploaded.as_deref(),
            Step::PaymentVerified => self.payment_verified.as_deref(),
            Step::ApplicationReview => self.application_review.as_deref(),
        }
    }

    fn raw_time(&self, step: Step) -> Option<DateTime<Utc>> {
        let raw = match step {
            Step::ApplicationSubmitted => self.application_submitted_updated_at.as_deref(),
            Step::DocumentUploaded => self.document_uploaded_updated_at.as_deref(),
            Step::PaymentVerified => self.payment_verified_updated_at.as_deref(),
            Step::ApplicationReview => self.application_review_updated_at.as_deref(),
        }?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }

    fn checklist(&self, step: Step) -> ChecklistStatus {
        let raw = self.raw(step).unwrap_or_default();
        ChecklistStatus::from_stored(raw).unwrap_or_else(|| {
            log::warn!(
                "Unknown {} value {:?} for {}, reading it as pending",
                step.column(),
                raw,
                self.student_number
            );
            ChecklistStatus::Pending
        })
    }

    fn review(&self) -> ReviewStatus {
        let raw = self.raw(Step::ApplicationReview).unwrap_or_default();
        ReviewStatus::from_stored(raw).unwrap_or_else(|| {
            log::warn!(
                "Unknown application_review value {:?} for {}, reading it as pending",
                raw,
                self.student_number
            );
            ReviewStatus::Pending
        })
    }

    fn normalize(&self) -> ProgressRecord {
        ProgressRecord {
            student_number: self.student_number.clone(),
            user_id: self.user_id.clone().unwrap_or_default(),
            application_submitted: self.checklist(Step::ApplicationSubmitted),
            document_uploaded: self.checklist(Step::DocumentUploaded),
            payment_verified: self.checklist(Step::PaymentVerified),
            application_review: self.review(),
            review_note: self.review_note.clone(),
            reviewed_by: self.reviewed_by.clone(),
            updated: StepTimes {
                application_submitted: self.raw_time(Step::ApplicationSubmitted),
                document_uploaded: self.raw_time(Step::DocumentUploaded),
                payment_verified: self.raw_time(Step::PaymentVerified),
                application_review: self.raw_time(Step::ApplicationReview),
            },
        }
    }
}

fn not_found(student_number: &str) -> ServiceError {
    ServiceError::not_found(format!("No application progress for {student_number}"))
}

fn fetch_row(app: &AppState, student_number: &str) -> ServiceResult<ProgressRow> {
    app.store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number)
        .maybe_single_as()?
        .ok_or_else(|| not_found(student_number))
}

/// Creates the initial record of a registration, every step pending.
pub fn create(
    app: &AppState,
    student_number: &str,
    user_id: &str,
) -> ServiceResult<ProgressRecord> {
    let record = ProgressRecord::new(student_number, user_id);
    let mut row = Map::new();
    row.insert("student_number".into(), json!(student_number));
    row.insert("user_id".into(), json!(user_id));
    for step in Step::CHECKLIST {
        row.insert(step.column().into(), json!(ChecklistStatus::Pending.as_str()));
    }
    row.insert(
        Step::ApplicationReview.column().into(),
        json!(ReviewStatus::Pending.as_str()),
    );
    app.store
        .from(Table::ProgressManagement)
        .insert(&Value::Object(row))
        .map_err(|e| {
            if e.is_constraint() {
                ServiceError::conflict(format!("Progress for {student_number} already exists"))
            } else {
                e.into()
            }
        })?;
    Ok(record)
}

pub fn fetch(app: &AppState, student_number: &str) -> ServiceResult<ProgressRecord> {
    Ok(fetch_row(app, student_number)?.normalize())
}

pub fn fetch_optional(
    app: &AppState,
    student_number: &str,
) -> ServiceResult<Option<ProgressRecord>> {
    Ok(app
        .store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number)
        .maybe_single_as::<ProgressRow>()?
        .map(|row| row.normalize()))
}

/// Sets one step. Approving the review goes through `approve`; rejecting it
/// needs a reason and goes through `reject`.
pub fn update_step(
    app: &AppState,
    student_number: &str,
    step: Step,
    status: &str,
    actor: &UserProfile,
) -> ServiceResult<ProgressRecord> {
    let value = step.parse_status(status.trim())?;
    match value {
        StepValue::Review(ReviewStatus::Approved) => return approve(app, student_number, actor),
        StepValue::Review(ReviewStatus::Rejected) => {
            return Err(ServiceError::validation("A rejection reason is required"));
        }
        _ => {}
    }

    let now = Utc::now();
    let mut patch = Map::new();
    patch.insert(step.column().into(), json!(value.as_str()));
    patch.insert(step.updated_at_column().into(), json!(now));
    if let StepValue::Review(_) = value {
        patch.insert("review_note".into(), Value::Null);
        patch.insert("reviewed_by".into(), Value::Null);
    }
    let changed = app
        .store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number)
        .update(Value::Object(patch))?;
    if changed == 0 {
        return Err(not_found(student_number));
    }
    log::info!(
        "{} set {} of {} to {}",
        actor.email,
        step.column(),
        student_number,
        value.as_str()
    );
    fetch(app, student_number)
}

/// Approves the review when the three checklist steps are complete.
pub fn approve(
    app: &AppState,
    student_number: &str,
    admin: &UserProfile,
) -> ServiceResult<ProgressRecord> {
    let row = fetch_row(app, student_number)?;
    let missing = row.normalize().missing_prerequisites();
    if !missing.is_empty() {
        return Err(ServiceError::IncompleteChecklist(missing));
    }
    write_approval(app, &row, admin)?;

    log::info!("{} approved the application of {}", admin.email, student_number);
    notify_applicant(
        app,
        &row,
        admin,
        NotificationKind::Success,
        "Application Approved",
        "Congratulations! Your application has been approved.".to_string(),
    );
    fetch(app, student_number)
}

/// Writes the approval only if the checklist columns still hold what `seen`
/// held. Otherwise the row is left alone and the current state is reported.
fn write_approval(app: &AppState, seen: &ProgressRow, admin: &UserProfile) -> ServiceResult<()> {
    let student_number = seen.student_number.as_str();
    let mut query = app
        .store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number);
    for step in Step::CHECKLIST {
        let value = seen.raw(step).map_or(Value::Null, |raw| json!(raw));
        query = query.eq(step.column(), value);
    }
    let changed = query.update(json!({
        "application_review": ReviewStatus::Approved.as_str(),
        "application_review_updated_at": Utc::now(),
        "review_note": Value::Null,
        "reviewed_by": admin.full_name(),
    }))?;
    if changed > 0 {
        return Ok(());
    }

    let missing = fetch(app, student_number)?.missing_prerequisites();
    log::warn!("Approval of {student_number} lost a race with a concurrent update");
    if missing.is_empty() {
        return Err(ServiceError::conflict(
            "The application changed while it was being approved, please try again",
        ));
    }
    Err(ServiceError::IncompleteChecklist(missing))
}

pub fn reject(
    app: &AppState,
    student_number: &str,
    reason: &str,
    admin: &UserProfile,
) -> ServiceResult<ProgressRecord> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ServiceError::validation("A rejection reason is required"));
    }
    let row = fetch_row(app, student_number)?;
    app.store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number)
        .update(json!({
            "application_review": ReviewStatus::Rejected.as_str(),
            "application_review_updated_at": Utc::now(),
            "review_note": reason,
            "reviewed_by": admin.full_name(),
        }))?;

    log::info!("{} rejected the application of {}", admin.email, student_number);
    notify_applicant(
        app,
        &row,
        admin,
        NotificationKind::Error,
        "Application Rejected",
        format!("Your application has been rejected. Reason: {reason}"),
    );
    fetch(app, student_number)
}

/// Returns the review to `pending`, undoing an approval or a rejection.
pub fn revert(
    app: &AppState,
    student_number: &str,
    admin: &UserProfile,
) -> ServiceResult<ProgressRecord> {
    let row = fetch_row(app, student_number)?;
    app.store
        .from(Table::ProgressManagement)
        .eq("student_number", student_number)
        .update(json!({
            "application_review": ReviewStatus::Pending.as_str(),
            "application_review_updated_at": Utc::now(),
            "review_note": Value::Null,
            "reviewed_by": Value::Null,
        }))?;

    log::info!("{} reverted the review of {}", admin.email, student_number);
    notify_applicant(
        app,
        &row,
        admin,
        NotificationKind::Info,
        "Application Under Review",
        "Your application has been returned to review.".to_string(),
    );
    fetch(app, student_number)
}

fn notify_applicant(
    app: &AppState,
    row: &ProgressRow,
    admin: &UserProfile,
    kind: NotificationKind,
    title: &str,
    message: String,
) {
    let Some(user_id) = row.user_id.as_deref().filter(|id| !id.is_empty()) else {
        log::warn!("No applicant to notify for {}", row.student_number);
        return;
    };
    notifications::notify(
        app,
        user_id,
        &Outgoing {
            sender_id: Some(&admin.id),
            kind,
            title,
            message: &message,
        },
    );
}

//! Admin dashboard counters.

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AdminUser;
use crate::services::notifications::unread_count;
use crate::state::AppState;
use crate::store::Table;
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Scope};
use common::model::course::CourseStatus;
use common::model::progress::{ReviewStatus, Step};
use serde::Serialize;

const API_PATH: &str = "/api/dashboard";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", get().to(summary))
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub registrations: usize,
    pub pending_reviews: usize,
    pub approved: usize,
    pub rejected: usize,
    pub open_courses: usize,
    pub unread_notifications: usize,
}

/// Review counts come from normalized records, so legacy spellings are
/// counted with their canonical status.
pub(crate) fn summarize(app: &AppState, admin_id: &str) -> ServiceResult<DashboardSummary> {
    let mut summary = DashboardSummary {
        registrations: app.store.from(Table::Register).count()?,
        open_courses: app
            .store
            .from(Table::Courses)
            .eq("status", CourseStatus::Open.as_str())
            .count()?,
        unread_notifications: unread_count(app, admin_id)?,
        ..DashboardSummary::default()
    };

    let review_column = Step::ApplicationReview.column();
    for row in app.store.from(Table::ProgressManagement).select()? {
        let stored = row.get(review_column).and_then(|v| v.as_str()).unwrap_or("");
        match ReviewStatus::from_stored(stored).unwrap_or(ReviewStatus::Pending) {
            ReviewStatus::Approved => summary.approved += 1,
            ReviewStatus::Rejected => summary.rejected += 1,
            ReviewStatus::Pending | ReviewStatus::InProgress => summary.pending_reviews += 1,
        }
    }
    Ok(summary)
}

async fn summary(
    state: web::Data<AppState>,
    admin: AdminUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(summarize(&state, admin.id())?))
}

//! # Registrations Service Module
//!
//! Applications for a course and the admin review table built on them.
//!
//! ## Sub-modules:
//! - `create`: validates a submission, allocates its student number and
//!   creates the progress and document records that go with it.
//! - `export`: the review table as CSV.

mod create;
mod export;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::{AdminUser, CurrentUser};
use crate::services::documents::record;
use crate::services::progress::workflow;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{get, post, scope};
use actix_web::{web, HttpResponse, Scope};
use common::model::document::{DocumentOverview, DocumentStatus};
use common::model::registration::{Registration, StudentOverview};
use serde::Serialize;

const API_PATH: &str = "/api/registrations";

/// Routes under `/api/registrations`:
///
/// *   **`POST /`**: submits an application for the caller.
/// *   **`GET /`**: every registration, newest first, with progress (admin).
/// *   **`GET /mine`**: the caller's registrations.
/// *   **`GET /export`**: the admin listing as CSV.
/// *   **`GET /{student_number}`**: one registration with its documents.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("", get().to(list))
        .route("/mine", get().to(mine))
        .route("/export", get().to(export::process))
        .route("/{student_number}", get().to(detail))
}

#[derive(Debug, Serialize)]
struct StudentDetail {
    #[serde(flatten)]
    overview: StudentOverview,
    documents: DocumentOverview,
}

fn overview_of(app: &AppState, registration: Registration) -> ServiceResult<StudentOverview> {
    let progress = workflow::fetch_optional(app, &registration.student_number)?;
    let document_status = record::fetch_optional(app, &registration.user_id)?
        .map_or(DocumentStatus::Pending, |d| d.status);
    Ok(StudentOverview {
        registration,
        progress,
        document_status,
    })
}

/// Every registration, newest first, joined with progress and document status.
pub(crate) fn all_overviews(app: &AppState) -> ServiceResult<Vec<StudentOverview>> {
    let registrations: Vec<Registration> = app
        .store
        .from(Table::Register)
        .order("reg_date", Direction::Desc)
        .select_as()?;
    registrations
        .into_iter()
        .map(|registration| overview_of(app, registration))
        .collect()
}

async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(all_overviews(&state)?))
}

async fn mine(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    let registrations: Vec<Registration> = state
        .store
        .from(Table::Register)
        .eq("user_id", user.id())
        .order("reg_date", Direction::Desc)
        .select_as()?;
    let overviews = registrations
        .into_iter()
        .map(|registration| overview_of(&state, registration))
        .collect::<ServiceResult<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(overviews))
}

async fn detail(
    state: web::Data<AppState>,
    user: CurrentUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let registration: Registration = state
        .store
        .from(Table::Register)
        .eq("student_number", student_number.as_str())
        .maybe_single_as()?
        .ok_or_else(|| {
            ServiceError::not_found(format!("No registration for {}", student_number.as_str()))
        })?;
    if registration.user_id != user.id() {
        user.require_admin()?;
    }

    let documents = record::overview(&state, &registration.user_id)?;
    let overview = overview_of(&state, registration)?;
    Ok(HttpResponse::Ok().json(StudentDetail {
        overview,
        documents,
    }))
}

//! # Progress Service Module
//!
//! HTTP surface of the application review workflow. All logic and every
//! write lives in `workflow`; the handlers only authorize and translate.

pub mod workflow;

use crate::error::ServiceError;
use crate::services::auth::{AdminUser, CurrentUser};
use crate::state::AppState;
use actix_web::web::{get, post, put, scope};
use actix_web::{web, HttpResponse, Scope};
use common::model::progress::Step;
use common::requests::{RejectRequest, StepUpdateRequest};

const API_PATH: &str = "/api/progress";

/// Routes under `/api/progress/{student_number}`:
///
/// *   **`GET`**: the normalized record; the applicant or an admin.
/// *   **`PUT /steps/{step}`**: sets one step (`application_submitted`,
///     `document_uploaded`, `payment_verified`, `application_review`).
/// *   **`POST /approve`**, **`POST /reject`**, **`POST /revert`**: review
///     decisions. Approval is refused while any checklist step is incomplete.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{student_number}", get().to(fetch))
        .route("/{student_number}/steps/{step}", put().to(update_step))
        .route("/{student_number}/approve", post().to(approve))
        .route("/{student_number}/reject", post().to(reject))
        .route("/{student_number}/revert", post().to(revert))
}

async fn fetch(
    state: web::Data<AppState>,
    user: CurrentUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let record = workflow::fetch(&state, &student_number)?;
    if record.user_id != user.id() {
        user.require_admin()?;
    }
    Ok(HttpResponse::Ok().json(record))
}

async fn update_step(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<(String, String)>,
    payload: web::Json<StepUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (student_number, step) = path.into_inner();
    let step = Step::parse(&step)?;
    let record = workflow::update_step(&state, &student_number, step, &payload.status, &admin.0)?;
    Ok(HttpResponse::Ok().json(record))
}

async fn approve(
    state: web::Data<AppState>,
    admin: AdminUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let record = workflow::approve(&state, &student_number, &admin.0)?;
    Ok(HttpResponse::Ok().json(record))
}

async fn reject(
    state: web::Data<AppState>,
    admin: AdminUser,
    student_number: web::Path<String>,
    payload: web::Json<RejectRequest>,
) -> Result<HttpResponse, ServiceError> {
    let record = workflow::reject(&state, &student_number, &payload.reason, &admin.0)?;
    Ok(HttpResponse::Ok().json(record))
}

async fn revert(
    state: web::Data<AppState>,
    admin: AdminUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let record = workflow::revert(&state, &student_number, &admin.0)?;
    Ok(HttpResponse::Ok().json(record))
}

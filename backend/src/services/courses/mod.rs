//! # Courses Service Module
//!
//! Course catalog, the Open/Closed lifecycle with its status history, and the
//! intake view students apply from.

mod intake;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AdminUser;
use crate::services::validation;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{get, post, put, scope};
use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use common::model::course::{Course, CourseStatus, HistoryAction, StatusHistory};
use common::requests::{CourseStatusRequest, NewCourse};
use serde::Serialize;
use serde_json::json;

const API_PATH: &str = "/api/courses";

/// Routes under `/api/courses`:
///
/// *   **`GET /`**: every course, by name.
/// *   **`POST /`**: creates a course (admin).
/// *   **`GET /intake`**: courses with the caller's intake state.
/// *   **`POST /{id}/toggle`**: flips Open/Closed (admin).
/// *   **`PUT /{id}/status`**: sets an explicit status (admin).
/// *   **`GET /{id}/history`**: status changes, newest first (admin).
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/intake", get().to(intake::process))
        .route("/{id}/toggle", post().to(toggle))
        .route("/{id}/status", put().to(set_status))
        .route("/{id}/history", get().to(history))
}

/// Result of a status change: the course and the history row it produced.
#[derive(Debug, Serialize)]
struct StatusChange {
    course: Course,
    history: StatusHistory,
}

pub(crate) fn list_courses(app: &AppState) -> ServiceResult<Vec<Course>> {
    Ok(app
        .store
        .from(Table::Courses)
        .order("name", Direction::Asc)
        .select_as()?)
}

pub(crate) fn find_by_name(app: &AppState, name: &str) -> ServiceResult<Option<Course>> {
    Ok(app
        .store
        .from(Table::Courses)
        .eq("name", name)
        .maybe_single_as()?)
}

fn find(app: &AppState, id: &str) -> ServiceResult<Course> {
    app.store
        .from(Table::Courses)
        .eq("id", id)
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found("Course not found"))
}

async fn list(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(list_courses(&state)?))
}

pub(crate) fn create_course(app: &AppState, req: NewCourse) -> ServiceResult<Course> {
    let name = validation::required("Course name", &req.name)?;
    let duration = validation::required("Duration", &req.duration)?;
    let description = validation::required("Description", &req.description)?;
    if req.closing_date < req.opening_date {
        return Err(ServiceError::validation(
            "Closing date cannot be before the opening date",
        ));
    }

    let duplicate = || ServiceError::conflict(format!("A course named \"{name}\" already exists"));
    if find_by_name(app, &name)?.is_some() {
        return Err(duplicate());
    }

    let course = Course {
        id: String::new(),
        name: name.clone(),
        duration,
        mode: req.mode,
        level: req.level,
        description,
        status: req.status,
        opening_date: req.opening_date,
        closing_date: req.closing_date,
        created_at: Utc::now(),
    };
    let row = app
        .store
        .from(Table::Courses)
        .insert(&course)
        .map_err(|e| if e.is_constraint() { duplicate() } else { e.into() })?;
    Ok(crate::store::decode(row)?)
}

async fn create(
    state: web::Data<AppState>,
    admin: AdminUser,
    payload: web::Json<NewCourse>,
) -> Result<HttpResponse, ServiceError> {
    let course = create_course(&state, payload.into_inner())?;
    log::info!("{} created course {}", admin.full_name(), course.name);
    Ok(HttpResponse::Created().json(course))
}

/// Moves a course to `status` and appends one history row.
///
/// The update is conditional on the status that was read, so two concurrent
/// toggles cannot both record a change.
fn change_status(
    app: &AppState,
    course: Course,
    status: CourseStatus,
    admin: &AdminUser,
) -> ServiceResult<StatusChange> {
    if course.status == status {
        return Err(ServiceError::conflict(format!(
            "Course is already {}",
            status.as_str()
        )));
    }
    let changed = app
        .store
        .from(Table::Courses)
        .eq("id", course.id.as_str())
        .eq("status", course.status.as_str())
        .update(json!({ "status": status.as_str() }))?;
    if changed == 0 {
        return Err(ServiceError::conflict(
            "The course status changed in the meantime, please reload",
        ));
    }

    let now = Utc::now();
    let action = HistoryAction::for_status(status);
    let entry = StatusHistory {
        id: String::new(),
        course_id: course.id.clone(),
        date: now.date_naive(),
        action,
        admin: admin.full_name(),
        note: action.note().to_string(),
        created_at: now,
    };
    let history = crate::store::decode(app.store.from(Table::StatusHistory).insert(&entry)?)?;
    log::info!("{} set course {} to {}", entry.admin, course.name, status.as_str());

    Ok(StatusChange {
        course: Course { status, ..course },
        history,
    })
}

async fn toggle(
    state: web::Data<AppState>,
    admin: AdminUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let course = find(&state, &id)?;
    let next = course.status.toggled();
    Ok(HttpResponse::Ok().json(change_status(&state, course, next, &admin)?))
}

async fn set_status(
    state: web::Data<AppState>,
    admin: AdminUser,
    id: web::Path<String>,
    payload: web::Json<CourseStatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let course = find(&state, &id)?;
    Ok(HttpResponse::Ok().json(change_status(&state, course, payload.status, &admin)?))
}

async fn history(
    state: web::Data<AppState>,
    _admin: AdminUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let course = find(&state, &id)?;
    let entries: Vec<StatusHistory> = state
        .store
        .from(Table::StatusHistory)
        .eq("course_id", course.id.as_str())
        .order("date", Direction::Desc)
        .order("created_at", Direction::Desc)
        .select_as()?;
    Ok(HttpResponse::Ok().json(entries))
}

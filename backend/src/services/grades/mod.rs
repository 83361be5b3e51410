//! # Grades Service Module
//!
//! Course grades out of 100 with pass/fail filtering and averages.

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AdminUser;
use crate::services::validation;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{delete, get, post, put, scope};
use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use common::model::grade::{average, GradeEntry};
use common::requests::{GradeQuery, GradeRequest};
use serde::Serialize;
use serde_json::json;

const API_PATH: &str = "/api/grades";
const MAX_GRADE: u8 = 100;

/// Routes under `/api/grades`, all admin only:
///
/// *   **`GET /?course=..&search=..&filter=All|Pass|Fail`**: entries of a
///     course and the course average.
/// *   **`POST /`**, **`PUT /{id}`**, **`DELETE /{id}`**: edits.
/// *   **`GET /students/{student_number}/average`**: average across courses.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/students/{student_number}/average", get().to(student_average))
        .route("/{id}", put().to(update))
        .route("/{id}", delete().to(remove))
}

#[derive(Debug, Serialize)]
struct CourseGrades {
    course: String,
    entries: Vec<GradeEntry>,
    average: Option<f64>,
}

#[derive(Debug, Serialize)]
struct StudentAverage {
    student_number: String,
    courses: usize,
    average: Option<f64>,
}

fn validated(req: GradeRequest) -> ServiceResult<GradeEntry> {
    if req.grade > MAX_GRADE {
        return Err(ServiceError::validation("Grade must be between 0 and 100"));
    }
    Ok(GradeEntry {
        id: String::new(),
        course: validation::required("Course", &req.course)?,
        student_number: validation::required("Student number", &req.student_number)?,
        name: validation::required("Name", &req.name)?,
        grade: req.grade,
        comment: req.comment.trim().to_string(),
        updated_at: Utc::now(),
    })
}

fn find(app: &AppState, id: &str) -> ServiceResult<GradeEntry> {
    app.store
        .from(Table::Grades)
        .eq("id", id)
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found("Grade entry not found"))
}

/// Entries of a course matching the name search and the pass/fail filter.
/// The average covers the whole course.
pub(crate) fn course_grades(
    app: &AppState,
    query: &GradeQuery,
) -> ServiceResult<(Vec<GradeEntry>, Option<f64>)> {
    let course = validation::required("Course", &query.course)?;
    let all: Vec<GradeEntry> = app
        .store
        .from(Table::Grades)
        .eq("course", course.as_str())
        .order("name", Direction::Asc)
        .select_as()?;
    let course_average = average(all.iter().map(|e| e.grade));

    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let entries = all
        .into_iter()
        .filter(|e| query.filter.matches(e))
        .filter(|e| {
            needle
                .as_deref()
                .map_or(true, |n| e.name.to_lowercase().contains(n))
        })
        .collect();
    Ok((entries, course_average))
}

/// Average over every course of a student; the student number matches
/// regardless of case.
pub(crate) fn student_average_of(
    app: &AppState,
    student_number: &str,
) -> ServiceResult<(usize, Option<f64>)> {
    let wanted = student_number.trim();
    let grades: Vec<GradeEntry> = app.store.from(Table::Grades).select_as()?;
    let mine: Vec<u8> = grades
        .iter()
        .filter(|e| e.student_number.eq_ignore_ascii_case(wanted))
        .map(|e| e.grade)
        .collect();
    Ok((mine.len(), average(mine)))
}

async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<GradeQuery>,
) -> Result<HttpResponse, ServiceError> {
    let (entries, average) = course_grades(&state, &query)?;
    Ok(HttpResponse::Ok().json(CourseGrades {
        course: query.course.trim().to_string(),
        entries,
        average,
    }))
}

async fn create(
    state: web::Data<AppState>,
    admin: AdminUser,
    payload: web::Json<GradeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let entry = validated(payload.into_inner())?;
    let stored: GradeEntry =
        crate::store::decode(state.store.from(Table::Grades).insert(&entry)?)?;
    log::info!(
        "{} graded {} {} in {}",
        admin.full_name(),
        stored.student_number,
        stored.grade,
        stored.course
    );
    Ok(HttpResponse::Created().json(stored))
}

async fn update(
    state: web::Data<AppState>,
    _admin: AdminUser,
    id: web::Path<String>,
    payload: web::Json<GradeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let existing = find(&state, &id)?;
    let entry = validated(payload.into_inner())?;
    state
        .store
        .from(Table::Grades)
        .eq("id", existing.id.as_str())
        .update(json!({
            "course": entry.course,
            "student_number": entry.student_number,
            "name": entry.name,
            "grade": entry.grade,
            "comment": entry.comment,
            "updated_at": entry.updated_at,
        }))?;
    Ok(HttpResponse::Ok().json(GradeEntry {
        id: existing.id,
        ..entry
    }))
}

async fn remove(
    state: web::Data<AppState>,
    _admin: AdminUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let existing = find(&state, &id)?;
    state
        .store
        .from(Table::Grades)
        .eq("id", existing.id.as_str())
        .delete()?;
    Ok(HttpResponse::NoContent().finish())
}

async fn student_average(
    state: web::Data<AppState>,
    _admin: AdminUser,
    student_number: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let (courses, average) = student_average_of(&state, &student_number)?;
    Ok(HttpResponse::Ok().json(StudentAverage {
        student_number: student_number.into_inner(),
        courses,
        average,
    }))
}

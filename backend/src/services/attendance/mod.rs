//! # Attendance Service Module
//!
//! Daily attendance of enrolled students. One record per student, course and
//! day; marking the same day again overwrites it.

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AdminUser;
use crate::services::validation;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{get, post, scope};
use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use common::model::attendance::{AttendanceRecord, AttendanceSummary};
use common::requests::{AttendanceQuery, MarkAttendanceRequest};
use serde::Serialize;
use serde_json::json;

const API_PATH: &str = "/api/attendance";

/// Course filter value meaning every course.
const ALL_COURSES: &str = "All";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(mark))
}

#[derive(Debug, Serialize)]
struct AttendanceSheet {
    records: Vec<AttendanceRecord>,
    summary: AttendanceSummary,
}

/// Inserts or overwrites the record for (student, course, day).
pub(crate) fn mark_attendance(
    app: &AppState,
    req: MarkAttendanceRequest,
) -> ServiceResult<AttendanceRecord> {
    let student_number = validation::required("Student number", &req.student_number)?;
    let name = validation::required("Name", &req.name)?;
    let course = validation::required("Course", &req.course)?;
    let date = req.date.unwrap_or_else(|| Utc::now().date_naive());

    let record = AttendanceRecord {
        id: String::new(),
        student_number,
        name,
        course,
        date,
        status: req.status,
        mode: req.mode,
        updated_at: Utc::now(),
    };
    let key = app
        .store
        .from(Table::Attendance)
        .eq("student_number", record.student_number.as_str())
        .eq("course", record.course.as_str())
        .eq("date", record.date.to_string());

    let existing: Option<AttendanceRecord> = key.clone().maybe_single_as()?;
    match existing {
        Some(existing) => {
            key.update(json!({
                "name": record.name,
                "status": record.status,
                "mode": record.mode,
                "updated_at": record.updated_at,
            }))?;
            Ok(AttendanceRecord {
                id: existing.id,
                ..record
            })
        }
        None => Ok(crate::store::decode(
            app.store.from(Table::Attendance).insert(&record)?,
        )?),
    }
}

pub(crate) fn list_attendance(
    app: &AppState,
    query: &AttendanceQuery,
) -> ServiceResult<Vec<AttendanceRecord>> {
    let mut q = app.store.from(Table::Attendance);
    if let Some(course) = query
        .course
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != ALL_COURSES)
    {
        q = q.eq("course", course);
    }
    if let Some(date) = query.date {
        q = q.eq("date", date.to_string());
    }
    Ok(q.order("date", Direction::Desc)
        .order("name", Direction::Asc)
        .select_as()?)
}

async fn mark(
    state: web::Data<AppState>,
    admin: AdminUser,
    payload: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse, ServiceError> {
    let record = mark_attendance(&state, payload.into_inner())?;
    log::info!(
        "{} marked {} {:?} for {} on {}",
        admin.full_name(),
        record.student_number,
        record.status,
        record.course,
        record.date
    );
    Ok(HttpResponse::Ok().json(record))
}

async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ServiceError> {
    let records = list_attendance(&state, &query)?;
    let summary = AttendanceSummary::from_records(&records);
    Ok(HttpResponse::Ok().json(AttendanceSheet { records, summary }))
}

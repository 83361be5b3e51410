//! Status of background jobs started by other services.

use crate::error::ServiceError;
use crate::services::auth::AdminUser;
use crate::state::AppState;
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Scope};

const API_PATH: &str = "/api/jobs";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{job_id}", get().to(status))
}

async fn status(
    state: web::Data<AppState>,
    _admin: AdminUser,
    job_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    match state.jobs.get(&job_id).await {
        Some(status) => Ok(HttpResponse::Ok().json(status)),
        None => Err(ServiceError::not_found("Job ID not found")),
    }
}

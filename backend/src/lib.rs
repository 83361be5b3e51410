//! Admissions and administration server for a vocational school.
//!
//! Applicants register for a course, upload their documents and follow their
//! application through a review workflow; administrators review applications
//! and manage courses, attendance, grades and fees.

pub mod config;
pub mod error;
pub mod job_controller;
pub mod objects;
pub mod services;
pub mod state;
pub mod store;

use crate::error::ServiceError;
use crate::state::AppState;
use actix_web::web;

/// Registers the shared state, the extractor limits and every service scope.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let json_limit = state.config.server.json_limit;
        cfg.app_data(web::Data::new(state))
            .app_data(
                web::JsonConfig::default()
                    .limit(json_limit)
                    .error_handler(|err, _req| {
                        ServiceError::validation(format!("Invalid request body: {err}")).into()
                    }),
            )
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                ServiceError::validation(format!("Invalid query string: {err}")).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                ServiceError::validation(format!("Invalid path: {err}")).into()
            }))
            .service(services::auth::configure_routes())
            .service(services::registrations::configure_routes())
            .service(services::progress::configure_routes())
            .service(services::documents::configure_routes())
            .service(services::courses::configure_routes())
            .service(services::notifications::configure_routes())
            .service(services::attendance::configure_routes())
            .service(services::grades::configure_routes())
            .service(services::fees::configure_routes())
            .service(services::jobs::configure_routes())
            .service(services::dashboard::configure_routes())
            .service(services::storage::configure_routes());
    }
}

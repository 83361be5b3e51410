//! # Storage Service Module
//!
//! Serves objects behind the URLs produced by `ObjectStore`: signed links for
//! private buckets and plain links for buckets configured as public.

use crate::error::ServiceError;
use crate::objects::ObjectError;
use crate::state::AppState;
use actix_files::NamedFile;
use actix_web::web::{get, scope};
use actix_web::{web, Scope};
use chrono::Utc;
use serde::Deserialize;

const API_PATH: &str = "/storage/v1/object";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/sign/{bucket}/{path:.*}", get().to(signed))
        .route("/public/{bucket}/{path:.*}", get().to(public))
}

#[derive(Debug, Deserialize)]
struct SignedQuery {
    token: String,
    expires: i64,
}

async fn open(app: &AppState, bucket: &str, path: &str) -> Result<NamedFile, ServiceError> {
    let file_path = app.objects.object_path(bucket, path)?;
    if !file_path.is_file() {
        return Err(ObjectError::NotFound(format!("{bucket}/{path}")).into());
    }
    let file = NamedFile::open_async(&file_path)
        .await
        .map_err(ObjectError::Io)?;
    Ok(file.set_content_type(mime_guess::from_path(&file_path).first_or_octet_stream()))
}

async fn signed(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<SignedQuery>,
) -> Result<NamedFile, ServiceError> {
    let (bucket, object) = path.into_inner();
    state
        .objects
        .verify(&bucket, &object, &query.token, query.expires, Utc::now().timestamp())?;
    open(&state, &bucket, &object).await
}

async fn public(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<NamedFile, ServiceError> {
    let (bucket, object) = path.into_inner();
    if !state.objects.is_public(&bucket) {
        return Err(ServiceError::Forbidden(format!("Bucket {bucket} is not public")));
    }
    open(&state, &bucket, &object).await
}

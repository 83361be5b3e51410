use super::record::{self, BUCKET};
use crate::error::ServiceError;
use crate::objects::ObjectError;
use crate::services::auth::{AdminUser, CurrentUser};
use crate::state::AppState;
use crate::store::Table;
use actix_web::{web, HttpResponse};
use common::model::document::{Attachment, DocumentRecord, DocumentType};
use common::requests::VerifyRequest;

pub async fn mine(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(record::overview(&state, user.id())?))
}

pub async fn by_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(record::overview(&state, &user_id)?))
}

pub async fn remove(
    state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let attachment: Attachment = state
        .store
        .from(Table::Attachments)
        .eq("id", id.as_str())
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found("Attachment not found"))?;
    let document: DocumentRecord = state
        .store
        .from(Table::Documents)
        .eq("id", attachment.document_id.as_str())
        .single_as()?;
    if document.user_id != user.id() {
        user.require_admin()?;
    }

    match state.objects.remove(BUCKET, &attachment.file_path) {
        Ok(()) => {}
        Err(ObjectError::NotFound(path)) => log::warn!("Object {path} was already gone"),
        Err(e) => return Err(e.into()),
    }
    state
        .store
        .from(Table::Attachments)
        .eq("id", attachment.id.as_str())
        .delete()?;

    let remaining = state
        .store
        .from(Table::Attachments)
        .eq("document_id", document.id.as_str())
        .eq("doc_type", attachment.doc_type.as_str())
        .count()?;
    if remaining == 0 {
        record::set_flags(&state, document, attachment.doc_type, Some(false), Some(false))?;
    }
    log::info!("Removed {} of {}", attachment.file_path, user.id());
    Ok(HttpResponse::NoContent().finish())
}

pub async fn verify(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<(String, String)>,
    payload: web::Json<VerifyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (user_id, doc_type) = path.into_inner();
    let doc_type = DocumentType::parse(&doc_type)
        .ok_or_else(|| ServiceError::validation(format!("Unknown document type `{doc_type}`")))?;
    let document = record::fetch_optional(&state, &user_id)?
        .ok_or_else(|| ServiceError::not_found("No documents for this applicant"))?;
    if payload.verified && !document.uploaded(doc_type) {
        return Err(ServiceError::validation(format!(
            "{} has not been uploaded yet",
            doc_type.label()
        )));
    }

    let document = record::set_flags(&state, document, doc_type, None, Some(payload.verified))?;
    log::info!(
        "{} marked {} of {} as {}",
        admin.full_name(),
        doc_type.as_str(),
        user_id,
        if payload.verified { "verified" } else { "unverified" }
    );
    Ok(HttpResponse::Ok().json(document))
}

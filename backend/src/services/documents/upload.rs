use super::record::{self, BUCKET};
use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::CurrentUser;
use crate::state::AppState;
use crate::store::Table;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::document::{allowed_extension, validate_upload, Attachment, UploadRejection};
use common::requests::UploadMeta;
use futures_util::StreamExt;
use md5::Context;

const MAX_META_BYTES: usize = 16 * 1024;
const MIB: u64 = 1024 * 1024;

/// A file part that passed the extension and size checks.
struct ReceivedFile {
    name: String,
    extension: String,
    bytes: Vec<u8>,
    md5: String,
}

pub async fn process(
    state: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let attachment = upload_document(&state, user.id(), payload).await?;
    Ok(HttpResponse::Created().json(attachment))
}

fn malformed(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::validation(format!("Malformed upload: {e}"))
}

async fn read_meta(field: &mut Field) -> ServiceResult<UploadMeta> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        bytes.extend_from_slice(&chunk.map_err(malformed)?);
        if bytes.len() > MAX_META_BYTES {
            return Err(ServiceError::validation("Document metadata is too large"));
        }
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::validation(format!("Invalid document metadata: {e}")))
}

/// Streams the file part, rejecting it as soon as the extension or the size
/// is known to be unacceptable.
async fn read_file(field: &mut Field, max_bytes: u64) -> ServiceResult<ReceivedFile> {
    let name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
        .unwrap_or_default();
    let extension = allowed_extension(&name)?;

    let mut bytes = Vec::new();
    let mut md5_hasher = Context::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if (bytes.len() + chunk.len()) as u64 > max_bytes {
            return Err(UploadRejection::TooLarge {
                max_mb: max_bytes / MIB,
            }
            .into());
        }
        md5_hasher.consume(&chunk);
        bytes.extend_from_slice(&chunk);
    }

    Ok(ReceivedFile {
        name,
        extension,
        bytes,
        md5: format!("{:x}", md5_hasher.finalize()),
    })
}

pub(crate) async fn upload_document(
    app: &AppState,
    user_id: &str,
    mut payload: Multipart,
) -> ServiceResult<Attachment> {
    let max_bytes = app.config.uploads.max_bytes;
    let mut meta: Option<UploadMeta> = None;
    let mut file: Option<ReceivedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;
        let part = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match part.as_deref() {
            Some("json") => meta = Some(read_meta(&mut field).await?),
            Some("file") => {
                if meta.is_none() {
                    return Err(ServiceError::validation(
                        "Document metadata must be sent before the file",
                    ));
                }
                file = Some(read_file(&mut field, max_bytes).await?);
            }
            _ => {}
        }
    }

    let meta = meta.ok_or_else(|| ServiceError::validation("Missing document metadata"))?;
    let file = file.ok_or_else(|| ServiceError::validation("Missing file"))?;
    validate_upload(&file.name, file.bytes.len() as u64, max_bytes)?;

    let doc_type = meta.doc_type;
    let document = record::ensure(app, user_id)?;
    if document.uploaded(doc_type) {
        return Err(ServiceError::conflict(format!(
            "{} has already been uploaded. Remove it before uploading a new file.",
            doc_type.label()
        )));
    }

    let object_path = format!(
        "{}/{}/{}{}",
        user_id,
        doc_type.as_str(),
        file.md5,
        file.extension
    );
    app.objects.upload(BUCKET, &object_path, &file.bytes)?;

    let attachment = Attachment {
        id: String::new(),
        document_id: document.id.clone(),
        doc_type,
        file_path: object_path.clone(),
        file_type: mime_guess::from_path(&file.name)
            .first_or_octet_stream()
            .to_string(),
        file_name: file.name,
        size_bytes: file.bytes.len() as u64,
        md5: file.md5,
        uploaded_at: Utc::now(),
        url: None,
    };
    let row = match app.store.from(Table::Attachments).insert(&attachment) {
        Ok(row) => row,
        Err(e) => {
            if let Err(cleanup) = app.objects.remove(BUCKET, &object_path) {
                log::warn!("Orphaned object {object_path}: {cleanup}");
            }
            return Err(e.into());
        }
    };
    let mut stored: Attachment = crate::store::decode(row)?;

    record::set_flags(app, document, doc_type, Some(true), Some(false))?;
    log::info!(
        "Stored {} ({} bytes) for {}",
        doc_type.as_str(),
        stored.size_bytes,
        user_id
    );

    stored.url = app.object_url(BUCKET, &stored.file_path).ok();
    Ok(stored)
}

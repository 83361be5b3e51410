use crate::error::ServiceResult;
use crate::state::AppState;
use crate::store::{Direction, Table};
use chrono::Utc;
use common::model::document::{Attachment, DocumentOverview, DocumentRecord, DocumentType};
use serde_json::{json, Map, Value};

/// Bucket holding applicant documents.
pub const BUCKET: &str = "documents";

pub fn fetch_optional(app: &AppState, user_id: &str) -> ServiceResult<Option<DocumentRecord>> {
    Ok(app
        .store
        .from(Table::Documents)
        .eq("user_id", user_id)
        .maybe_single_as()?)
}

/// The record of `user_id`, created with every flag cleared when missing.
pub fn ensure(app: &AppState, user_id: &str) -> ServiceResult<DocumentRecord> {
    if let Some(record) = fetch_optional(app, user_id)? {
        return Ok(record);
    }
    match app
        .store
        .from(Table::Documents)
        .insert(&DocumentRecord::new(user_id))
    {
        Ok(row) => Ok(crate::store::decode(row)?),
        // created concurrently
        Err(e) if e.is_constraint() => Ok(app
            .store
            .from(Table::Documents)
            .eq("user_id", user_id)
            .single_as()?),
        Err(e) => Err(e.into()),
    }
}

/// Writes the flags of one type and the recomputed aggregate status.
pub fn set_flags(
    app: &AppState,
    mut record: DocumentRecord,
    doc_type: DocumentType,
    uploaded: Option<bool>,
    verified: Option<bool>,
) -> ServiceResult<DocumentRecord> {
    if let Some(value) = uploaded {
        record.set_uploaded(doc_type, value);
    }
    if let Some(value) = verified {
        record.set_verified(doc_type, value);
    }
    record.status = record.derived_status();
    record.updated_at = Some(Utc::now());

    let mut patch = Map::new();
    patch.insert(
        doc_type.uploaded_column().into(),
        json!(record.uploaded(doc_type)),
    );
    patch.insert(
        doc_type.verified_column().into(),
        json!(record.verified(doc_type)),
    );
    patch.insert("status".into(), json!(record.status));
    patch.insert("updated_at".into(), json!(record.updated_at));
    app.store
        .from(Table::Documents)
        .eq("id", record.id.as_str())
        .update(Value::Object(patch))?;
    Ok(record)
}

/// Attachments of a record, newest first, each with a download URL.
pub fn attachments(app: &AppState, record: &DocumentRecord) -> ServiceResult<Vec<Attachment>> {
    let mut attachments: Vec<Attachment> = app
        .store
        .from(Table::Attachments)
        .eq("document_id", record.id.as_str())
        .order("uploaded_at", Direction::Desc)
        .select_as()?;
    for attachment in &mut attachments {
        attachment.url = match app.object_url(BUCKET, &attachment.file_path) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("No URL for {}: {}", attachment.file_path, e);
                None
            }
        };
    }
    Ok(attachments)
}

pub fn overview(app: &AppState, user_id: &str) -> ServiceResult<DocumentOverview> {
    let record = fetch_optional(app, user_id)?.unwrap_or_else(|| DocumentRecord::new(user_id));
    let attachments = if record.id.is_empty() {
        Vec::new()
    } else {
        attachments(app, &record)?
    };
    Ok(DocumentOverview {
        checklist: record.checklist(),
        record,
        attachments,
    })
}

//! # Documents Service Module
//!
//! Applicant document uploads and their verification.
//!
//! ## Sub-modules:
//! - `record`: the only code writing the `documents` table; keeps the
//!   aggregate status in step with the flags.
//! - `upload`: multipart upload of one document (`json` part, then `file`).
//! - `manage`: listing, removal and admin verification.

mod manage;
pub(crate) mod record;
mod upload;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/documents";

/// Routes under `/api/documents`:
///
/// *   **`POST /upload`** (`upload::process`): multipart body with a `json`
///     part (`{"doc_type": "id"}`) followed by a `file` part. Extension and
///     size are checked while the file streams in, before anything is stored.
/// *   **`GET /mine`** (`manage::mine`): checklist and attachments of the
///     caller, with download URLs.
/// *   **`GET /{user_id}`** (`manage::by_user`): the same for one applicant
///     (admin).
/// *   **`DELETE /attachments/{id}`** (`manage::remove`): deletes the file
///     and clears the flags of its type (owner or admin).
/// *   **`PUT /{user_id}/verify/{doc_type}`** (`manage::verify`): sets or
///     clears the verified flag of an uploaded type (admin).
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("/mine", get().to(manage::mine))
        .route("/attachments/{id}", delete().to(manage::remove))
        .route("/{user_id}", get().to(manage::by_user))
        .route("/{user_id}/verify/{doc_type}", put().to(manage::verify))
}

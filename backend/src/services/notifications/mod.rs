//! Notifications: admin broadcasts, the per-user inbox and the internal
//! `notify` helper used by the workflow and registration.
//!
//! Delivery is fire-and-forget. A failed insert from `notify` is logged and
//! never fails the operation that triggered it.

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::{AdminUser, CurrentUser};
use crate::services::validation;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{get, post, put, scope};
use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use common::model::notification::{Notification, NotificationKind};
use common::model::user::{Role, UserProfile};
use common::requests::SendNotificationRequest;
use serde_json::json;

const API_PATH: &str = "/api/notifications";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(send))
        .route("/mine", get().to(mine))
        .route("/mine/unread", get().to(unread))
        .route("/{id}/read", put().to(mark_read))
}

/// A notification about to be stored.
pub(crate) struct Outgoing<'a> {
    pub sender_id: Option<&'a str>,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
}

fn insert(
    app: &AppState,
    recipient_id: &str,
    outgoing: &Outgoing<'_>,
) -> ServiceResult<Notification> {
    let notification = Notification {
        id: String::new(),
        recipient_id: recipient_id.to_string(),
        sender_id: outgoing.sender_id.map(str::to_string),
        kind: outgoing.kind,
        title: outgoing.title.to_string(),
        message: outgoing.message.to_string(),
        read: false,
        created_at: Utc::now(),
    };
    let row = app.store.from(Table::Notifications).insert(&notification)?;
    Ok(crate::store::decode(row)?)
}

/// Stores a notification, logging instead of failing.
pub(crate) fn notify(app: &AppState, recipient_id: &str, outgoing: &Outgoing<'_>) {
    if let Err(e) = insert(app, recipient_id, outgoing) {
        log::warn!(
            "Could not deliver notification \"{}\" to {}: {}",
            outgoing.title,
            recipient_id,
            e
        );
    }
}

/// Notifies every admin account.
pub(crate) fn notify_admins(app: &AppState, outgoing: &Outgoing<'_>) {
    let admins = app
        .store
        .from(Table::UserProfile)
        .eq("role", "admin")
        .select_as::<UserProfile>();
    match admins {
        Ok(admins) => {
            for admin in admins.iter().filter(|a| a.role == Role::Admin) {
                notify(app, &admin.id, outgoing);
            }
        }
        Err(e) => log::warn!("Could not list admins for \"{}\": {}", outgoing.title, e),
    }
}

async fn send(
    state: web::Data<AppState>,
    admin: AdminUser,
    payload: web::Json<SendNotificationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let req = payload.into_inner();
    let title = validation::required("Title", &req.title)?;
    let message = validation::required("Message", &req.message)?;
    let recipients: Vec<String> = req
        .recipients
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if recipients.is_empty() {
        return Err(ServiceError::validation("At least one recipient is required"));
    }

    let outgoing = Outgoing {
        sender_id: Some(admin.id()),
        kind: req.kind,
        title: &title,
        message: &message,
    };
    let sent = recipients
        .iter()
        .map(|recipient| insert(&state, recipient, &outgoing))
        .collect::<ServiceResult<Vec<_>>>()?;
    Ok(HttpResponse::Created().json(sent))
}

async fn mine(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    let notifications: Vec<Notification> = state
        .store
        .from(Table::Notifications)
        .eq("recipient_id", user.id())
        .order("created_at", Direction::Desc)
        .select_as()?;
    Ok(HttpResponse::Ok().json(notifications))
}

pub(crate) fn unread_count(app: &AppState, user_id: &str) -> ServiceResult<usize> {
    Ok(app
        .store
        .from(Table::Notifications)
        .eq("recipient_id", user_id)
        .eq("read", false)
        .count()?)
}

async fn unread(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    let unread = unread_count(&state, user.id())?;
    Ok(HttpResponse::Ok().json(json!({ "unread": unread })))
}

async fn mark_read(
    state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = id.into_inner();
    let notification: Notification = state
        .store
        .from(Table::Notifications)
        .eq("id", id.as_str())
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found("Notification not found"))?;
    if notification.recipient_id != user.id() {
        return Err(ServiceError::Forbidden(
            "This notification belongs to another user".to_string(),
        ));
    }
    state
        .store
        .from(Table::Notifications)
        .eq("id", id.as_str())
        .update(json!({ "read": true }))?;
    Ok(HttpResponse::Ok().json(Notification {
        read: true,
        ..notification
    }))
}

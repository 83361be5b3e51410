//! Request extractors resolving the bearer token of a request into a
//! `SessionState`.
//!
//! `Session` never fails for a missing or stale token; it reports
//! `SignedOut`. `CurrentUser` requires a signed-in user (401 otherwise) and
//! `AdminUser` additionally requires the admin role (403 otherwise).

use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;
use crate::store::Table;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{DateTime, Utc};
use common::model::user::{SessionState, UserProfile};
use futures_util::future::{ready, Ready};
use serde::{Deserialize, Serialize};

/// A row of `sessions`; `id` is the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRow {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    token: Option<String>,
    state: SessionState,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }
}

/// The signed-in user of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.0
    }

    pub fn require_admin(&self) -> ServiceResult<()> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Only administrators can perform this action".to_string(),
            ))
        }
    }
}

/// A signed-in user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserProfile);

impl AdminUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn full_name(&self) -> String {
        self.0.full_name()
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Looks the token up and walks the session lifecycle for its user.
pub(crate) fn resolve(app: &AppState, token: &str) -> ServiceResult<SessionState> {
    let Some(session) = app
        .store
        .from(Table::Sessions)
        .eq("id", token)
        .maybe_single_as::<SessionRow>()?
    else {
        return Ok(SessionState::SignedOut);
    };

    if session.expires_at <= Utc::now() {
        log::debug!("Session for user {} has expired", session.user_id);
        app.store.from(Table::Sessions).eq("id", token).delete()?;
        return Ok(SessionState::SignedOut);
    }

    let Some(profile) = app
        .store
        .from(Table::UserProfile)
        .eq("id", session.user_id.as_str())
        .maybe_single_as::<UserProfile>()?
    else {
        log::warn!("Session {} points at a missing profile", session.id);
        return Ok(SessionState::SignedOut);
    };

    let state = SessionState::SignedOut
        .begin(profile.email.clone())?
        .complete(profile)?;
    Ok(state)
}

fn extract_session(req: &HttpRequest) -> ServiceResult<Session> {
    let app = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ServiceError::Internal("application state is not registered".to_string()))?;
    let Some(token) = bearer_token(req) else {
        return Ok(Session {
            token: None,
            state: SessionState::SignedOut,
        });
    };
    let state = resolve(app, &token)?;
    Ok(Session {
        token: Some(token),
        state,
    })
}

fn extract_user(req: &HttpRequest) -> ServiceResult<UserProfile> {
    match extract_session(req)?.into_state() {
        SessionState::SignedIn { user } => Ok(user),
        _ => Err(ServiceError::Unauthorized(
            "Authentication required".to_string(),
        )),
    }
}

impl FromRequest for Session {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_session(req))
    }
}

impl FromRequest for CurrentUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_user(req).map(CurrentUser))
    }
}

impl FromRequest for AdminUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = extract_user(req).and_then(|user| {
            let current = CurrentUser(user);
            current.require_admin()?;
            Ok(AdminUser(current.0))
        });
        ready(result)
    }
}

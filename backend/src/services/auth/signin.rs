use super::password::verify_password;
use super::session::{Session, SessionRow};
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;
use crate::store::Table;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use common::model::user::{SessionState, UserProfile};
use common::requests::SignInRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct AuthUserRow {
    id: String,
    password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: SessionState,
}

pub async fn process(
    state: web::Data<AppState>,
    payload: web::Json<SignInRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = sign_in(&state, payload.into_inner())?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn sign_out(
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, ServiceError> {
    if let Some(token) = session.token() {
        let removed = state.store.from(Table::Sessions).eq("id", token).delete()?;
        log::debug!("Signed out, {removed} session(s) removed");
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn current(session: Session) -> HttpResponse {
    HttpResponse::Ok().json(session.into_state())
}

pub(crate) fn sign_in(app: &AppState, req: SignInRequest) -> ServiceResult<SignInResponse> {
    let email = req.email.trim().to_ascii_lowercase();
    let attempt = SessionState::SignedOut.begin(email.clone())?;

    let user = app
        .store
        .from(Table::AuthUsers)
        .eq("email", email.as_str())
        .maybe_single_as::<AuthUserRow>()?
        .filter(|user| verify_password(&req.password, &user.password_hash));
    let Some(user) = user else {
        log::info!("Rejected sign-in for {email}");
        return Err(ServiceError::Unauthorized(
            "Invalid login credentials".to_string(),
        ));
    };

    let profile: UserProfile = app
        .store
        .from(Table::UserProfile)
        .eq("id", user.id.as_str())
        .single_as()?;
    let session = attempt.complete(profile)?;

    let now = Utc::now();
    let row = SessionRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::hours(app.config.auth.session_ttl_hours),
    };
    app.store.from(Table::Sessions).insert(&row)?;

    Ok(SignInResponse {
        token: row.id,
        expires_at: row.expires_at,
        session,
    })
}

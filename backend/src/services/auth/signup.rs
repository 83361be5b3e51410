use super::password::{hash_password, MIN_PASSWORD_LEN};
use crate::error::{ServiceError, ServiceResult};
use crate::services::validation;
use crate::state::AppState;
use crate::store::Table;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::user::{Role, UserProfile};
use common::requests::SignUpRequest;
use serde_json::json;

pub async fn process(
    state: web::Data<AppState>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ServiceError> {
    let profile = sign_up(&state, payload.into_inner())?;
    Ok(HttpResponse::Created().json(profile))
}

fn already_registered() -> ServiceError {
    ServiceError::conflict("User already registered")
}

pub(crate) fn sign_up(app: &AppState, req: SignUpRequest) -> ServiceResult<UserProfile> {
    let email = validation::email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let first_name = validation::required("First name", &req.first_name)?;
    let surname = validation::required("Surname", &req.surname)?;

    if app.store.from(Table::AuthUsers).eq("email", email.as_str()).count()? > 0 {
        return Err(already_registered());
    }

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let auth_user = app
        .store
        .from(Table::AuthUsers)
        .insert(&json!({
            "email": email,
            "password_hash": password_hash,
            "created_at": now,
        }))
        .map_err(|e| {
            if e.is_constraint() {
                already_registered()
            } else {
                e.into()
            }
        })?;
    let user_id = auth_user
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string();

    let admin_domain = app.config.auth.admin_email_domain.to_ascii_lowercase();
    let role = if !admin_domain.is_empty() && email.ends_with(&admin_domain) {
        Role::Admin
    } else {
        Role::Student
    };

    let profile = UserProfile {
        id: user_id,
        first_name,
        surname,
        email,
        role,
        created_at: now,
    };
    app.store.from(Table::UserProfile).insert(&profile)?;
    log::info!("Registered {:?} account {}", profile.role, profile.email);
    Ok(profile)
}

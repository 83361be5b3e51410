//! # Fees Service Module
//!
//! Fee schedule, per-student payments and invoices. Amounts are integer
//! cents everywhere; `format_rand` is only applied when rendering.
//!
//! ## Sub-modules:
//! - `invoice`: invoice lines, PDF rendering with `genpdf` and the batch job
//!   writing one PDF per account.

pub(crate) mod invoice;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::{AdminUser, CurrentUser};
use crate::services::validation;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::web::{get, post, put, scope};
use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use common::model::fee::{FeeAccount, FeeItem, FeeStatement, DEFAULT_FEE_SCHEDULE};
use common::model::registration::Registration;
use common::requests::{AccountQuery, FeeItemUpdate, PaymentRequest};
use serde_json::json;

const API_PATH: &str = "/api/fees";

/// Routes under `/api/fees`:
///
/// *   **`GET /items`**: the fee schedule in display order.
/// *   **`PUT /items/{key}`**: changes the amount of one item (admin).
/// *   **`GET /accounts?search=..`**: statements of every account (admin).
/// *   **`POST /accounts`**: records the amount paid by a student (admin).
/// *   **`GET /accounts/{student_number}/invoice`**: invoice PDF; the student
///     or an admin.
/// *   **`POST /invoices/batch`**: starts a job writing every invoice to the
///     invoice directory (admin). Poll `/api/jobs/{job_id}`.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/items", get().to(items))
        .route("/items/{key}", put().to(update_item))
        .route("/accounts", get().to(accounts))
        .route("/accounts", post().to(record_payment))
        .route("/accounts/{student_number}/invoice", get().to(invoice::process))
        .route("/invoices/batch", post().to(invoice::start_batch))
}

/// Installs the default schedule into an empty `fee_items` table and returns
/// the number of items written.
pub fn seed_fee_schedule(app: &AppState) -> ServiceResult<usize> {
    if app.store.from(Table::FeeItems).count()? > 0 {
        return Ok(0);
    }
    for (position, (key, label, amount_cents)) in DEFAULT_FEE_SCHEDULE.iter().enumerate() {
        let item = FeeItem {
            id: String::new(),
            key: key.to_string(),
            label: label.to_string(),
            amount_cents: *amount_cents,
            position: position as i64,
        };
        app.store.from(Table::FeeItems).insert(&item)?;
    }
    log::info!("Seeded {} fee items", DEFAULT_FEE_SCHEDULE.len());
    Ok(DEFAULT_FEE_SCHEDULE.len())
}

pub(crate) fn fee_items(app: &AppState) -> ServiceResult<Vec<FeeItem>> {
    Ok(app
        .store
        .from(Table::FeeItems)
        .order("position", Direction::Asc)
        .select_as()?)
}

pub(crate) fn fetch_account(app: &AppState, student_number: &str) -> ServiceResult<FeeAccount> {
    app.store
        .from(Table::FeeAccounts)
        .eq("student_number", student_number)
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found(format!("No fee account for {student_number}")))
}

/// Statements of every account whose name or student number contains
/// `search`, ignoring case.
pub(crate) fn statements(app: &AppState, search: Option<&str>) -> ServiceResult<Vec<FeeStatement>> {
    let items = fee_items(app)?;
    let accounts: Vec<FeeAccount> = app
        .store
        .from(Table::FeeAccounts)
        .order("name", Direction::Asc)
        .select_as()?;
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    Ok(accounts
        .iter()
        .filter(|a| {
            needle.as_deref().map_or(true, |n| {
                a.name.to_lowercase().contains(n) || a.student_number.to_lowercase().contains(n)
            })
        })
        .map(|a| FeeStatement::new(a, &items))
        .collect())
}

/// Sets the amount paid by a student, creating the account on first payment.
pub(crate) fn upsert_payment(app: &AppState, req: PaymentRequest) -> ServiceResult<FeeStatement> {
    let student_number = validation::required("Student number", &req.student_number)?;
    let name = validation::required("Name", &req.name)?;
    if req.paid_cents < 0 {
        return Err(ServiceError::validation("Amount paid cannot be negative"));
    }

    let account = FeeAccount {
        id: String::new(),
        student_number,
        name,
        paid_cents: req.paid_cents,
        updated_at: Utc::now(),
    };
    let changed = app
        .store
        .from(Table::FeeAccounts)
        .eq("student_number", account.student_number.as_str())
        .update(json!({
            "name": account.name,
            "paid_cents": account.paid_cents,
            "updated_at": account.updated_at,
        }))?;
    if changed == 0 {
        app.store.from(Table::FeeAccounts).insert(&account)?;
    }
    Ok(FeeStatement::new(&account, &fee_items(app)?))
}

async fn items(
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(fee_items(&state)?))
}

async fn update_item(
    state: web::Data<AppState>,
    admin: AdminUser,
    key: web::Path<String>,
    payload: web::Json<FeeItemUpdate>,
) -> Result<HttpResponse, ServiceError> {
    if payload.amount_cents < 0 {
        return Err(ServiceError::validation("Fee amount cannot be negative"));
    }
    let item: FeeItem = state
        .store
        .from(Table::FeeItems)
        .eq("key", key.as_str())
        .maybe_single_as()?
        .ok_or_else(|| ServiceError::not_found(format!("Unknown fee item `{}`", key.as_str())))?;
    state
        .store
        .from(Table::FeeItems)
        .eq("key", item.key.as_str())
        .update(json!({ "amount_cents": payload.amount_cents }))?;
    log::info!(
        "{} set {} to {} cents",
        admin.full_name(),
        item.key,
        payload.amount_cents
    );
    Ok(HttpResponse::Ok().json(FeeItem {
        amount_cents: payload.amount_cents,
        ..item
    }))
}

async fn accounts(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(statements(&state, query.search.as_deref())?))
}

async fn record_payment(
    state: web::Data<AppState>,
    admin: AdminUser,
    payload: web::Json<PaymentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let statement = upsert_payment(&state, payload.into_inner())?;
    log::info!(
        "{} recorded {} cents paid by {}",
        admin.full_name(),
        statement.paid_cents,
        statement.student_number
    );
    Ok(HttpResponse::Ok().json(statement))
}

/// Admins see every account; a student only the ones registered to them.
pub(crate) fn authorize_account(
    app: &AppState,
    user: &CurrentUser,
    student_number: &str,
) -> ServiceResult<()> {
    if user.profile().is_admin() {
        return Ok(());
    }
    let registration: Option<Registration> = app
        .store
        .from(Table::Register)
        .eq("student_number", student_number)
        .maybe_single_as()?;
    match registration {
        Some(r) if r.user_id == user.id() => Ok(()),
        _ => user.require_admin(),
    }
}

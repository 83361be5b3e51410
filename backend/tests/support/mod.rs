#![allow(dead_code)]

use actix_web::http::header;
use actix_web::test::TestRequest;
use admissions::config::AppConfig;
use admissions::job_controller::state::JobsState;
use admissions::services::fees::seed_fee_schedule;
use admissions::state::AppState;
use admissions::store::Store;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "registrar@graceartisanschool.education";
pub const PASSWORD: &str = "secret-pass";
pub const BOUNDARY: &str = "X-ADMISSIONS-TEST-BOUNDARY";

/// Fresh state rooted in a temporary directory. Keep the `TempDir` alive for
/// the duration of the test.
pub fn test_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AppConfig::rooted_at(dir.path());
    let store = Store::open(&config.database.path).expect("open store");
    let state = AppState::new(config, store, JobsState::start());
    seed_fee_schedule(&state).expect("seed fees");
    (dir, state)
}

/// Builds the test service for `state`.
macro_rules! app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new().configure(admissions::configure($state.clone())),
        )
        .await
    };
}

/// Sends a `TestRequest` and returns the status and the JSON body
/// (`Null` when the body is empty or not JSON).
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body = actix_web::test::read_body(resp).await;
        let json: serde_json::Value =
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }};
}

/// Signs up `$email` and signs in, returning the bearer token.
macro_rules! account {
    ($app:expr, $email:expr, $first:expr, $surname:expr) => {{
        let (status, body) = send!(
            $app,
            $crate::support::post_json(
                "/api/auth/signup",
                None,
                $crate::support::signup_body($email, $first, $surname)
            )
        );
        assert_eq!(status, actix_web::http::StatusCode::CREATED, "{body}");
        let (status, body) = send!(
            $app,
            $crate::support::post_json(
                "/api/auth/signin",
                None,
                serde_json::json!({ "email": $email, "password": $crate::support::PASSWORD })
            )
        );
        assert_eq!(status, actix_web::http::StatusCode::OK, "{body}");
        body["token"].as_str().expect("token").to_string()
    }};
}

fn with_token(req: TestRequest, token: Option<&str>) -> TestRequest {
    match token {
        Some(token) => req.insert_header((header::AUTHORIZATION, format!("Bearer {token}"))),
        None => req,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> TestRequest {
    with_token(TestRequest::get().uri(uri), token)
}

pub fn delete(uri: &str, token: Option<&str>) -> TestRequest {
    with_token(TestRequest::delete().uri(uri), token)
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> TestRequest {
    with_token(TestRequest::post().uri(uri).set_json(body), token)
}

pub fn put_json(uri: &str, token: Option<&str>, body: Value) -> TestRequest {
    with_token(TestRequest::put().uri(uri).set_json(body), token)
}

pub fn signup_body(email: &str, first: &str, surname: &str) -> Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "first_name": first,
        "surname": surname,
    })
}

pub fn course_body(name: &str) -> Value {
    json!({
        "name": name,
        "duration": "6 months",
        "mode": "Full-time",
        "level": "Beginner",
        "description": "Hands-on trade course",
        "status": "Open",
        "opening_date": "2026-01-10",
        "closing_date": "2026-03-31",
    })
}

pub fn registration_body(national_id: &str, course: &str) -> Value {
    json!({
        "national_id": national_id,
        "first_name": "Thandi",
        "surname": "Mokoena",
        "email": "thandi@example.com",
        "phone": "+27 82 123 4567",
        "address": "12 Long Street, Cape Town",
        "course": course,
    })
}

/// A multipart upload with the `json` part first, as the upload handler expects.
pub fn upload(token: &str, doc_type: &str, file_name: &str, bytes: &[u8]) -> TestRequest {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"json\"\r\n\
             Content-Type: application/json\r\n\r\n{{\"doc_type\":\"{doc_type}\"}}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    TestRequest::post()
        .uri("/api/documents/upload")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

/// Path and query of an absolute object URL, usable as a test request URI.
pub fn local_uri(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    match without_scheme.find('/') {
        Some(pos) => without_scheme[pos..].to_string(),
        None => "/".to_string(),
    }
}

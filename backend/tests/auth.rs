#[macro_use]
mod support;

use actix_web::http::StatusCode;
use admissions::store::Table;
use chrono::{Duration, Utc};
use serde_json::json;
use support::{get, post_json, signup_body, ADMIN_EMAIL, PASSWORD};

#[actix_web::test]
async fn sign_up_assigns_role_from_email_domain() {
    let (_dir, state) = support::test_state();
    let app = app!(state);

    let (status, admin) = send!(
        app,
        post_json("/api/auth/signup", None, signup_body(ADMIN_EMAIL, "Registrar", "Admin"))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admin["role"], "admin");

    let (status, student) = send!(
        app,
        post_json(
            "/api/auth/signup",
            None,
            signup_body("Thandi@Example.com", "Thandi", "Mokoena")
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(student["role"], "student");
    assert_eq!(student["email"], "thandi@example.com");

    let (status, body) = send!(
        app,
        post_json(
            "/api/auth/signup",
            None,
            signup_body("thandi@example.com", "Other", "Person")
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already registered");
}

#[actix_web::test]
async fn sign_up_validates_fields() {
    let (_dir, state) = support::test_state();
    let app = app!(state);

    let mut short = signup_body("a@example.com", "A", "B");
    short["password"] = json!("12345");
    let (status, body) = send!(app, post_json("/api/auth/signup", None, short));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password should be at least 6 characters");

    let (status, body) = send!(
        app,
        post_json("/api/auth/signup", None, signup_body("not-an-email", "A", "B"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter a valid email address");

    let (status, body) = send!(
        app,
        post_json("/api/auth/signup", None, signup_body("a@example.com", "", "B"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "First name is required");
}

#[actix_web::test]
async fn session_lifecycle() {
    let (_dir, state) = support::test_state();
    let app = app!(state);

    let (_, body) = send!(app, get("/api/auth/session", None));
    assert_eq!(body["state"], "signed_out");

    let token = account!(app, "thandi@example.com", "Thandi", "Mokoena");
    let (status, body) = send!(app, get("/api/auth/session", Some(&token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "signed_in");
    assert_eq!(body["user"]["first_name"], "Thandi");

    let (status, body) = send!(
        app,
        post_json(
            "/api/auth/signin",
            None,
            json!({ "email": "thandi@example.com", "password": "wrong-password" })
        )
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid login credentials");

    let (status, body) = send!(
        app,
        post_json(
            "/api/auth/signin",
            None,
            json!({ "email": "nobody@example.com", "password": PASSWORD })
        )
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid login credentials");

    let (status, _) = send!(app, post_json("/api/auth/signout", Some(&token), json!({})));
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send!(app, get("/api/auth/session", Some(&token)));
    assert_eq!(body["state"], "signed_out");

    let (status, body) = send!(app, get("/api/documents/mine", Some(&token)));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(body["message"], "Authentication required");
}

#[actix_web::test]
async fn expired_session_is_signed_out_and_removed() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let token = account!(app, "thandi@example.com", "Thandi", "Mokoena");

    state
        .store
        .from(Table::Sessions)
        .eq("id", token.as_str())
        .update(json!({ "expires_at": Utc::now() - Duration::minutes(1) }))
        .unwrap();

    let (_, body) = send!(app, get("/api/auth/session", Some(&token)));
    assert_eq!(body["state"], "signed_out");
    assert_eq!(
        state.store.from(Table::Sessions).eq("id", token.as_str()).count().unwrap(),
        0
    );
    let (status, _) = send!(app, get("/api/documents/mine", Some(&token)));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

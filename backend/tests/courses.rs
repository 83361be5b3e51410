#[macro_use]
mod support;

use actix_web::http::StatusCode;
use serde_json::json;
use support::{course_body, get, post_json, put_json, ADMIN_EMAIL};

#[actix_web::test]
async fn each_toggle_appends_one_history_entry() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    let (status, course) = send!(
        app,
        post_json("/api/courses", Some(&admin), course_body("Welding"))
    );
    assert_eq!(status, StatusCode::CREATED, "{course}");
    let id = course["id"].as_str().expect("course id").to_string();

    let (status, body) = send!(
        app,
        post_json(&format!("/api/courses/{id}/toggle"), Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["course"]["status"], "Closed");
    assert_eq!(body["history"]["action"], "Closed");
    assert_eq!(body["history"]["note"], "The application has been closed");
    assert_eq!(body["history"]["admin"], "Registrar Admin");

    let (_, body) = send!(
        app,
        post_json(&format!("/api/courses/{id}/toggle"), Some(&admin), json!({}))
    );
    assert_eq!(body["course"]["status"], "Open");
    assert_eq!(body["history"]["action"], "Reopened");

    let (status, history) = send!(app, get(&format!("/api/courses/{id}/history"), Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().expect("history");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "Reopened");
    assert_eq!(entries[1]["action"], "Closed");
    assert_eq!(entries[0]["note"], "The application has been reopened");

    let (_, courses) = send!(app, get("/api/courses", None));
    assert_eq!(courses[0]["status"], "Open");
}

#[actix_web::test]
async fn setting_the_current_status_is_a_conflict() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    let (_, course) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    let id = course["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        put_json(
            &format!("/api/courses/{id}/status"),
            Some(&admin),
            json!({ "status": "Open" })
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Course is already Open");

    let (status, body) = send!(
        app,
        put_json(
            &format!("/api/courses/{id}/status"),
            Some(&admin),
            json!({ "status": "Closed" })
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["course"]["status"], "Closed");

    let (_, history) = send!(app, get(&format!("/api/courses/{id}/history"), Some(&admin)));
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    let (status, _) = send!(
        app,
        put_json(
            "/api/courses/no-such-course/status",
            Some(&admin),
            json!({ "status": "Closed" })
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn course_creation_is_validated_and_admin_only() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");

    let (status, _) = send!(app, post_json("/api/courses", Some(&student), course_body("Welding")));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut backwards = course_body("Welding");
    backwards["closing_date"] = json!("2025-12-31");
    let (status, body) = send!(app, post_json("/api/courses", Some(&admin), backwards));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Closing date cannot be before the opening date");

    let mut nameless = course_body(" ");
    nameless["duration"] = json!("3 months");
    let (status, body) = send!(app, post_json("/api/courses", Some(&admin), nameless));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Course name is required");

    let (status, _) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send!(
        app,
        post_json("/api/courses", Some(&admin), json!({ "name": "Incomplete" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn intake_reflects_course_status_and_application() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Carpentry")));
    let (_, closed) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    send!(
        app,
        post_json(
            &format!("/api/courses/{}/toggle", closed["id"].as_str().unwrap()),
            Some(&admin),
            json!({})
        )
    );

    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");
    let (status, intake) = send!(app, get("/api/courses/intake", Some(&student)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intake[0]["course"]["name"], "Carpentry");
    assert_eq!(intake[0]["state"], "apply");
    assert_eq!(intake[0]["label"], "Apply Now");
    assert_eq!(intake[1]["state"], "closed");

    send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            support::registration_body("900101", "Carpentry")
        )
    );
    let (_, intake) = send!(app, get("/api/courses/intake", Some(&student)));
    assert_eq!(intake[0]["state"], "in_progress");

    let (status, _) = send!(app, get("/api/courses/intake", None));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

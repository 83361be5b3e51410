#[macro_use]
mod support;

use actix_web::http::StatusCode;
use actix_web::test;
use admissions::store::Table;
use serde_json::{json, Value};
use support::{course_body, get, post_json, put_json, registration_body, ADMIN_EMAIL};

fn titles(notifications: &Value) -> Vec<String> {
    notifications
        .as_array()
        .expect("array")
        .iter()
        .map(|n| n["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[actix_web::test]
async fn approve_without_prerequisites_lists_every_missing_step() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    let (status, _) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    assert_eq!(status, StatusCode::CREATED);

    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");
    let (status, body) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Welding")
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["student_number"], "900101");
    assert_eq!(body["progress"]["application_review"], "pending");

    let (status, body) = send!(
        app,
        post_json("/api/progress/900101/approve", Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(
        body["message"],
        "Cannot approve application. Incomplete steps: Application Submitted, Document Uploaded, Payment Verified"
    );
    assert_eq!(
        body["details"]["missing"],
        json!(["application_submitted", "document_uploaded", "payment_verified"])
    );

    let (status, body) = send!(app, get("/api/progress/900101", Some(&student)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_review"], "pending");
    assert!(body["reviewed_by"].is_null());
}

#[actix_web::test]
async fn completed_checklist_can_be_approved_and_notifies_the_applicant() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Plumbing")));
    let student = account!(app, "sipho@example.com", "Sipho", "Dlamini");
    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("850505", "Plumbing")
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send!(app, get("/api/notifications/mine", Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    assert!(titles(&body).contains(&"New Application Received".to_string()));

    for step in ["application_submitted", "document_uploaded", "payment_verified"] {
        let (status, body) = send!(
            app,
            put_json(
                &format!("/api/progress/850505/steps/{step}"),
                Some(&admin),
                json!({ "status": "complete" })
            )
        );
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body[step], "complete");
    }

    let (status, body) = send!(
        app,
        post_json("/api/progress/850505/approve", Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["application_review"], "approved");
    assert_eq!(body["reviewed_by"], "Registrar Admin");

    let (_, body) = send!(app, get("/api/notifications/mine", Some(&student)));
    assert!(titles(&body).contains(&"Application Approved".to_string()));
    let (_, body) = send!(app, get("/api/notifications/mine/unread", Some(&student)));
    assert_eq!(body["unread"], 1);

    let (status, body) = send!(app, get("/api/courses/intake", Some(&student)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["state"], "enrolled");
    assert_eq!(body[0]["label"], "Enrolled");
}

#[actix_web::test]
async fn step_updates_require_an_admin_and_a_known_status() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");
    send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Welding")
        )
    );

    let (status, _) = send!(
        app,
        put_json(
            "/api/progress/900101/steps/payment_verified",
            Some(&student),
            json!({ "status": "complete" })
        )
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        put_json(
            "/api/progress/900101/steps/payment_verified",
            Some(&admin),
            json!({ "status": "approved" })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = send!(
        app,
        put_json(
            "/api/progress/900101/steps/shoe_size",
            Some(&admin),
            json!({ "status": "complete" })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send!(
        app,
        put_json(
            "/api/progress/000000/steps/payment_verified",
            Some(&admin),
            json!({ "status": "complete" })
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn reject_needs_a_reason_and_revert_returns_to_pending() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");
    send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Welding")
        )
    );

    let (status, body) = send!(
        app,
        post_json(
            "/api/progress/900101/reject",
            Some(&admin),
            json!({ "reason": "  " })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A rejection reason is required");

    let (status, body) = send!(
        app,
        post_json(
            "/api/progress/900101/reject",
            Some(&admin),
            json!({ "reason": "Incomplete matric results" })
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_review"], "rejected");
    assert_eq!(body["review_note"], "Incomplete matric results");

    let (_, body) = send!(app, get("/api/courses/intake", Some(&student)));
    assert_eq!(body[0]["state"], "rejected");

    let (status, body) = send!(
        app,
        post_json("/api/progress/900101/revert", Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_review"], "pending");
    assert!(body["reviewed_by"].is_null());

    let (_, body) = send!(app, get("/api/notifications/mine", Some(&student)));
    let titles = titles(&body);
    assert!(titles.contains(&"Application Rejected".to_string()));
    assert!(titles.contains(&"Application Under Review".to_string()));
}

#[actix_web::test]
async fn repeated_national_ids_get_suffixed_student_numbers() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));

    let mut numbers = Vec::new();
    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .into_iter()
        .enumerate()
    {
        let token = account!(app, email, "Student", &format!("No{i}"));
        let (status, body) = send!(
            app,
            post_json(
                "/api/registrations",
                Some(&token),
                registration_body("900101", "Welding")
            )
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        numbers.push(body["student_number"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(numbers, ["900101", "900101-2", "900101-3"]);

    let (status, body) = send!(app, get("/api/registrations", Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));
    assert_eq!(body[0]["student_number"], "900101-3");
}

#[actix_web::test]
async fn registration_rules_are_checked_before_anything_is_stored() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    let (_, course) = send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    let student = account!(app, "thandi@example.com", "Thandi", "Mokoena");

    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("9!", "Welding")
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_phone = registration_body("900101", "Welding");
    bad_phone["phone"] = json!("12");
    let (status, body) = send!(app, post_json("/api/registrations", Some(&student), bad_phone));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter a valid phone number");

    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Astrophysics")
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.store.from(Table::Register).count().unwrap(), 0);
    assert_eq!(state.store.from(Table::ProgressManagement).count().unwrap(), 0);

    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Welding")
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&student),
            registration_body("900101", "Welding")
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let toggle = format!("/api/courses/{}/toggle", course["id"].as_str().unwrap());
    send!(app, post_json(&toggle, Some(&admin), json!({})));
    let other = account!(app, "late@example.com", "Late", "Comer");
    let (status, body) = send!(
        app,
        post_json(
            "/api/registrations",
            Some(&other),
            registration_body("770707", "Welding")
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Applications for Welding are closed");

    let (status, _) = send!(
        app,
        post_json(
            "/api/registrations",
            None,
            registration_body("770707", "Welding")
        )
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn legacy_status_values_read_as_canonical() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    state
        .store
        .from(Table::ProgressManagement)
        .insert(&json!({
            "student_number": "LEGACY1",
            "user_id": "someone",
            "application_submitted": "Completed",
            "document_uploaded": "done",
            "payment_verified": " reset ",
            "application_review": "In Progress",
        }))
        .unwrap();

    let (status, body) = send!(app, get("/api/progress/LEGACY1", Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_submitted"], "complete");
    assert_eq!(body["document_uploaded"], "complete");
    assert_eq!(body["payment_verified"], "pending");
    assert_eq!(body["application_review"], "in_progress");

    let (status, body) = send!(
        app,
        post_json("/api/progress/LEGACY1/approve", Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["missing"], json!(["payment_verified"]));

    send!(
        app,
        put_json(
            "/api/progress/LEGACY1/steps/payment_verified",
            Some(&admin),
            json!({ "status": "complete" })
        )
    );
    let (status, body) = send!(
        app,
        post_json("/api/progress/LEGACY1/approve", Some(&admin), json!({}))
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["application_review"], "approved");
}

#[actix_web::test]
async fn dashboard_and_export_cover_every_registration() {
    let (_dir, state) = support::test_state();
    let app = app!(state);
    let admin = account!(app, ADMIN_EMAIL, "Registrar", "Admin");
    send!(app, post_json("/api/courses", Some(&admin), course_body("Welding")));
    for (email, id) in [("a@example.com", "111111"), ("b@example.com", "222222")] {
        let token = account!(app, email, "Student", "Applicant");
        send!(
            app,
            post_json(
                "/api/registrations",
                Some(&token),
                registration_body(id, "Welding")
            )
        );
    }

    let (status, body) = send!(app, get("/api/dashboard", Some(&admin)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registrations"], 2);
    assert_eq!(body["pending_reviews"], 2);
    assert_eq!(body["approved"], 0);
    assert_eq!(body["open_courses"], 1);
    assert_eq!(body["unread_notifications"], 2);

    let resp = test::call_service(
        &app,
        get("/api/registrations/export", Some(&admin)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let csv = test::read_body(resp).await;
    let text = String::from_utf8(csv.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("222222,222222,Thandi,Mokoena"));

    let student = account!(app, "c@example.com", "Nosy", "Student");
    let (status, _) = send!(app, get("/api/dashboard", Some(&student)));
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send!(app, get("/api/registrations/111111", Some(&student)));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

use axum::http::{Method, StatusCode};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tower::ServiceExt;

use crate::test_support::{self, json_request, read_json, TestContext};

fn deadline_in(offset: Duration) -> String {
    let deadline = OffsetDateTime::now_utc().replace_nanosecond(0).expect("nanoseconds") + offset;
    deadline.format(&Rfc3339).expect("format")
}

async fn create(ctx: &TestContext, token: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::POST, "/api/assignments", Some(token), Some(body), &[]))
        .await
        .expect("create assignment");
    let status = response.status();
    (status, read_json(response).await)
}

async fn fetch(ctx: &TestContext, token: &str, uri: &str) -> serde_json::Value {
    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::GET, uri, Some(token), None, &[]))
        .await
        .expect("get assignment");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

#[tokio::test]
async fn professor_creates_and_reads_assignment() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");

    let (status, created) =
        create(&ctx, &token, test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))))
            .await;
    assert_eq!(status, StatusCode::CREATED);
    let assignment_id = created["assignment_id"].as_i64().expect("assignment id");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/assignments/{assignment_id}"),
            Some(&token),
            None,
            &[],
        ))
        .await
        .expect("get assignment");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let assignment = &body["assignment"];
    assert_eq!(assignment["created_by"], "prof-7");
    assert_eq!(assignment["course_id"], "CS101");
    let questions = assignment["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 5);
    for (question, correct) in questions.iter().zip(test_support::CORRECT_LABELS) {
        let options = question["options"].as_array().expect("options");
        assert_eq!(options.len(), 4);
        let flagged: Vec<&str> = options
            .iter()
            .filter(|option| option["is_correct"] == json!(true))
            .filter_map(|option| option["label"].as_str())
            .collect();
        assert_eq!(flagged, vec![correct]);
        assert_eq!(question["marks"], json!(2.0));
    }

    let events = ctx.events.wait_for(1).await;
    assert_eq!(events[0].1["event"], "assignment.created");
    assert_eq!(events[0].1["assignment_id"], assignment_id);
}

#[tokio::test]
async fn validation_failures_return_codes_and_write_nothing() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    let deadline = deadline_in(Duration::hours(1));

    let mut four_questions = test_support::assignment_body("CS101", &deadline);
    four_questions["questions"].as_array_mut().expect("questions").pop();

    let mut duplicate_label = test_support::assignment_body("CS101", &deadline);
    duplicate_label["questions"][1]["options"][3]["label"] = json!("a");

    let mut no_correct = test_support::assignment_body("CS101", &deadline);
    no_correct["questions"][4]["options"][0]["is_correct"] = json!(false);

    let mut bad_marks = test_support::assignment_body("CS101", &deadline);
    bad_marks["questions"][0]["marks"] = json!(-1);

    let mut three_options = test_support::assignment_body("CS101", &deadline);
    three_options["questions"][2]["options"].as_array_mut().expect("options").pop();

    let mut bad_label = test_support::assignment_body("CS101", &deadline);
    bad_label["questions"][0]["options"][0]["label"] = json!("E");

    let mut missing_title = test_support::assignment_body("CS101", &deadline);
    missing_title.as_object_mut().expect("object").remove("title");

    let mut long_title = test_support::assignment_body("CS101", &deadline);
    long_title["title"] = json!("x".repeat(300));

    let cases = [
        (four_questions, "invalid_questions"),
        (duplicate_label, "duplicate_option_label"),
        (no_correct, "invalid_correct_option"),
        (bad_marks, "invalid_marks"),
        (three_options, "invalid_question"),
        (bad_label, "invalid_option_label"),
        (missing_title, "missing_fields"),
        (long_title, "invalid_field"),
    ];

    for (body, code) in cases {
        let (status, json) = create(&ctx, &token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(json["error"], code);
        assert_eq!(json["status"], 400);
    }

    assert_eq!(ctx.store.assignment_count(), 0);
}

#[tokio::test]
async fn rejected_json_bodies_use_the_error_shape() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");

    let mut wrong_type = test_support::assignment_body("CS101", &deadline_in(Duration::hours(1)));
    wrong_type["title"] = json!(12345);
    let (status, json) = create(&ctx, &token, wrong_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_body");
    assert_eq!(json["status"], 400);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::POST, "/api/assignments", Some(&token), None, &[]))
        .await
        .expect("bodyless create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_body");

    assert_eq!(ctx.store.assignment_count(), 0);
}

#[tokio::test]
async fn authoring_requires_professor_capability() {
    let ctx = test_support::setup_test_context().await;
    let body = test_support::assignment_body("CS101", &deadline_in(Duration::hours(1)));

    let student = test_support::student_token(ctx.state.settings(), 12);
    let (status, json) = create(&ctx, &student, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::POST, "/api/assignments", None, Some(body.clone()), &[]))
        .await
        .expect("anonymous create");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = create(&ctx, "not-a-jwt", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = test_support::token(ctx.state.settings(), json!({"role": "ADMIN", "sub": "root"}));
    let (status, _) = create(
        &ctx,
        &admin,
        test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn update_replaces_content_and_keeps_question_ids() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    let (_, created) =
        create(&ctx, &token, test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))))
            .await;
    let assignment_id = created["assignment_id"].as_i64().expect("assignment id");

    let before = read_json(
        ctx.app
            .clone()
            .oneshot(json_request(
                Method::GET,
                &format!("/api/assignments/{assignment_id}"),
                Some(&token),
                None,
                &[],
            ))
            .await
            .expect("get"),
    )
    .await;

    let mut body = test_support::assignment_body("CS101", "2031-03-01T09:30");
    body["title"] = json!("Week 3 quiz (revised)");
    body["questions"][0]["question_text"] = json!("Reworded");
    body["questions"][0]["options"][1]["is_correct"] = json!(false);
    body["questions"][0]["options"][2]["is_correct"] = json!(true);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/assignments/{assignment_id}"),
            Some(&token),
            Some(body),
            &[],
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let after = read_json(response).await;

    let assignment = &after["assignment"];
    assert_eq!(assignment["title"], "Week 3 quiz (revised)");
    assert_eq!(assignment["deadline"], "2031-03-01T09:30:00Z");
    assert_eq!(assignment["questions"][0]["question_text"], "Reworded");
    assert_eq!(assignment["questions"][0]["options"][2]["is_correct"], json!(true));
    assert_eq!(assignment["questions"][0]["options"][1]["is_correct"], json!(false));
    for index in 0..5 {
        assert_eq!(
            assignment["questions"][index]["question_id"],
            before["assignment"]["questions"][index]["question_id"]
        );
    }

    let events = ctx.events.wait_for(2).await;
    assert!(events.iter().any(|(_, body)| body["event"] == "assignment.updated"));
}

#[tokio::test]
async fn invalid_update_leaves_assignment_unchanged() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    let (_, created) =
        create(&ctx, &token, test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))))
            .await;
    let assignment_id = created["assignment_id"].as_i64().expect("assignment id");
    let uri = format!("/api/assignments/{assignment_id}");

    let before = fetch(&ctx, &token, &uri).await;

    let mut two_correct = test_support::assignment_body("CS101", &deadline_in(Duration::hours(2)));
    two_correct["title"] = json!("Should not stick");
    two_correct["questions"][0]["question_text"] = json!("Should not stick either");
    two_correct["questions"][3]["options"][0]["is_correct"] = json!(true);

    let mut wrong_type = test_support::assignment_body("CS101", &deadline_in(Duration::hours(2)));
    wrong_type["questions"] = json!("five questions");

    for (body, code) in [(two_correct, "invalid_correct_option"), (wrong_type, "invalid_body")] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::PUT, &uri, Some(&token), Some(body), &[]))
            .await
            .expect("update");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], code);
    }

    let after = fetch(&ctx, &token, &uri).await;
    assert_eq!(after, before);
    assert_eq!(ctx.events.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn update_rejects_bad_ids_and_unknown_assignments() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    let body = test_support::assignment_body("CS101", &deadline_in(Duration::hours(1)));

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::PUT, "/api/assignments/abc", Some(&token), Some(body.clone()), &[]))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "assignment_id_required");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::PUT, "/api/assignments/404", Some(&token), Some(body), &[]))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn professor_lists_submissions() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    let (_, created) =
        create(&ctx, &token, test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))))
            .await;
    let assignment_id = created["assignment_id"].as_i64().expect("assignment id");

    for student_id in [21, 22] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/student/assignments/{assignment_id}/autosave?student_id={student_id}"),
                None,
                Some(json!({"answers": []})),
                &[],
            ))
            .await
            .expect("autosave");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/student/assignments/{assignment_id}/submit?student_id=22"),
            None,
            Some(json!({"answers": []})),
            &[],
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/assignments/{assignment_id}/submissions"),
            Some(&token),
            None,
            &[],
        ))
        .await
        .expect("list submissions");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let submissions = body["submissions"].as_array().expect("submissions");
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0]["student_id"], 22);
    assert_eq!(submissions[0]["status"], "submitted");
    assert_eq!(submissions[0]["score"], json!(0.0));
    assert_eq!(submissions[1]["status"], "in_progress");

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/assignments/999/submissions", Some(&token), None, &[]))
        .await
        .expect("missing assignment");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_outage_surfaces_as_503() {
    let ctx = test_support::setup_test_context().await;
    let token = test_support::professor_token(ctx.state.settings(), "prof-7");
    ctx.store.set_unavailable(true);

    let (status, json) =
        create(&ctx, &token, test_support::assignment_body("CS101", &deadline_in(Duration::hours(1))))
            .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "storage_unavailable");
}

//! Log trail queries and endpoints. Skipped unless `DATABASE_URL` is set.

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use cdrr_engine::models::application_log::{self, LogSearchQuery, NewLogEntry};
use cdrr_engine::workflow::WorkflowEngine;
use common::{TEST_USER, create_application, setup_test_db};

fn entry(application_id: i64, step: &str, user: &str) -> NewLogEntry {
    NewLogEntry {
        application_id,
        application_step: Some(step.to_string()),
        user_name: Some(user.to_string()),
        application_status: Some("In progress".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_trail_is_newest_first_and_filterable_by_step() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let app = create_application(pool, 4001, "Amoxil").await;

    for step in ["Decking", "Evaluation", "Checking"] {
        application_log::insert(pool, &entry(app.id, step, "ana")).await.unwrap();
    }

    let trail = application_log::find_by_application(pool, app.id).await.unwrap();
    let steps: Vec<_> = trail.iter().map(|l| l.application_step.clone().unwrap()).collect();
    assert_eq!(steps, vec!["Checking", "Evaluation", "Decking"]);

    let eval = application_log::find_by_application_and_step(pool, app.id, "evaluation").await.unwrap();
    assert_eq!(eval.len(), 1);

    let found = application_log::find_by_id(pool, trail[0].id).await.unwrap().unwrap();
    assert_eq!(found.application_id, app.id);
    assert!(application_log::find_by_id(pool, trail[0].id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_insert_rolls_back_on_bad_entry() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let app = create_application(pool, 4002, "Biogesic").await;

    let batch = vec![entry(app.id, "QA", "ana"), entry(app.id + 500, "QA", "ana")];
    assert!(application_log::insert_many(pool, &batch).await.is_err());
    assert!(application_log::find_by_application(pool, app.id).await.unwrap().is_empty());

    let batch = vec![entry(app.id, "QA", "ana"), entry(app.id, "Director", "ben")];
    assert_eq!(application_log::insert_many(pool, &batch).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_by_user_step_and_limit() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let app = create_application(pool, 4003, "Neozep").await;
    for (step, user) in [("QA", "ana"), ("QA", "ben"), ("Director", "ana"), ("Director", "ana")] {
        application_log::insert(pool, &entry(app.id, step, user)).await.unwrap();
    }

    let search = |step: Option<&str>, user: Option<&str>, limit: Option<i64>| {
        LogSearchQuery {
            step: step.map(String::from),
            user: user.map(String::from),
            limit,
            ..Default::default()
        }
        .into_search()
        .unwrap()
    };

    assert_eq!(application_log::search(pool, &search(Some("qa"), None, None)).await.unwrap().len(), 2);
    assert_eq!(application_log::search(pool, &search(None, Some("ana"), None)).await.unwrap().len(), 3);
    assert_eq!(application_log::search(pool, &search(None, None, Some(1))).await.unwrap().len(), 1);

    let future = LogSearchQuery { from: Some("2999-01-01".into()), ..Default::default() }
        .into_search()
        .unwrap();
    assert!(application_log::search(pool, &future).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_log_endpoints_stamp_caller_and_check_application() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let created = create_application(&pool, 4004, "Alaxan").await;
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);

    let req = test::TestRequest::post()
        .uri("/api/application-logs")
        .cookie(cookie.clone())
        .set_json(json!({ "main_db_id": created.id, "application_step": "QA" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user_name"], TEST_USER);

    let req = test::TestRequest::post()
        .uri("/api/application-logs")
        .cookie(cookie.clone())
        .set_json(json!({ "application_id": created.id + 999 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let too_many: Vec<Value> = (0..101).map(|_| json!({ "application_id": created.id })).collect();
    let req = test::TestRequest::post()
        .uri("/api/application-logs/bulk")
        .cookie(cookie.clone())
        .set_json(too_many)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/application-logs/main-db/{}/step/qa", created.id))
        .cookie(cookie.clone())
        .to_request();
    let entries: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/application-logs?from=not-a-date")
        .cookie(cookie)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

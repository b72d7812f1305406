//! Stage actions end to end: HTTP request, transaction, delegation record and
//! log trail. Skipped unless `DATABASE_URL` points at a Postgres server.

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use cdrr_engine::config::WorkflowConfig;
use cdrr_engine::models::application_log;
use cdrr_engine::models::delegation::{self, Stage, StageState};
use cdrr_engine::workflow::WorkflowEngine;
use common::{create_application, setup_test_db};

fn deck_body(evaluator: &str) -> Value {
    json!({
        "decker": "Lead Decker",
        "evaluator": evaluator,
        "deckerDecision": "For evaluation",
        "deckerRemarks": "complete dossier",
        "dateDeckedEnd": "2024-05-02",
    })
}

fn eval_body(decision: &str, checker: Option<&str>) -> Value {
    json!({
        "evaluator": "Ana Cruz",
        "eval_decision": decision,
        "eval_remarks": "reviewed",
        "checker": checker,
    })
}

#[actix_web::test]
async fn test_deck_then_redeck_reports_previous_evaluator() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let created = create_application(&pool, 1001, "Amoxil").await;

    let before = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    assert!(!before.is_decked());

    let req = test::TestRequest::patch()
        .uri(&format!("/api/deck/single/{}", created.id))
        .cookie(cookie.clone())
        .set_json(deck_body("Ana Cruz"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updated_count"], 1);
    assert_eq!(body["message"], "Application (DTN: 1001) decked successfully");

    let decked = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    assert!(decked.is_decked());
    assert_eq!(decked.stage(Stage::Decker).state, StageState::Completed);
    assert_eq!(decked.stage(Stage::Evaluator).actor.as_deref(), Some("Ana Cruz"));
    assert_eq!(
        decked.stage(Stage::Decker).completed_at.unwrap().to_string(),
        "2024-05-02 00:00:00"
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/deck/single/{}", created.id))
        .cookie(cookie)
        .set_json(deck_body("Ben Reyes"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.ends_with("(was previously decked by: Ana Cruz)"), "{message}");

    let redecked = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(redecked.stage(Stage::Evaluator).actor.as_deref(), Some("Ben Reyes"));
}

#[actix_web::test]
async fn test_deck_missing_record_is_not_found() {
    let Some(db) = setup_test_db().await else { return };
    let app = test_app!(db.pool().clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);

    let req = test::TestRequest::patch()
        .uri("/api/deck/single/999999")
        .cookie(cookie)
        .set_json(deck_body("Ana Cruz"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_evaluate_undecked_application_fails() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let created = create_application(&pool, 1002, "Biogesic").await;

    // An "N/A" decker does not count as decked either.
    let mut record = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    record.stage_mut(Stage::Decker).actor = Some("N/A".to_string());
    record.stage_mut(Stage::Decker).state = StageState::Completed;
    let mut conn = pool.acquire().await.unwrap();
    delegation::save(&mut *conn, &record).await.unwrap();
    drop(conn);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/evaluation/single/{}", created.id))
        .cookie(cookie)
        .set_json(eval_body("Approved", Some("Carl Lim")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Application is not yet decked");

    let logs = application_log::find_by_application(&pool, created.id).await.unwrap();
    assert!(logs.is_empty());
}

#[actix_web::test]
async fn test_evaluate_twice_last_call_wins() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let created = create_application(&pool, 1003, "Neozep").await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/deck/single/{}", created.id))
        .cookie(cookie.clone())
        .set_json(deck_body("Ana Cruz"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    for (decision, checker) in [("For revision", "Carl Lim"), ("Approved", "Dina Uy")] {
        let req = test::TestRequest::patch()
            .uri(&format!("/api/evaluation/single/{}", created.id))
            .cookie(cookie.clone())
            .set_json(eval_body(decision, Some(checker)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/evaluation/status/{}", created.id))
        .cookie(cookie)
        .to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["is_decked"], true);
    assert_eq!(status["is_evaluated"], true);
    assert_eq!(status["eval_decision"], "Approved");
    assert_eq!(status["checker"], "Dina Uy");
}

#[actix_web::test]
async fn test_bulk_deck_reports_missing_ids_and_commits_the_rest() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let a = create_application(&pool, 1004, "Solmux").await;
    let missing = a.id + 1000;

    let mut body = deck_body("Ana Cruz");
    body["record_ids"] = json!([a.id, missing]);
    let req = test::TestRequest::patch()
        .uri("/api/deck/bulk")
        .cookie(cookie)
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = test::read_body_json(resp).await;
    assert_eq!(report["updated_count"], 1);
    assert_eq!(report["failed_count"], 1);

    let details = report["details"].as_array().unwrap();
    let failed = details.iter().find(|d| d["id"] == missing).unwrap();
    assert_eq!(failed["status"], "failed");
    assert!(failed["reason"].as_str().unwrap().contains("not found"));
    let ok = details.iter().find(|d| d["id"] == a.id).unwrap();
    assert_eq!(ok["status"], "success");
    assert_eq!(ok["evaluator"], "Ana Cruz");

    let record = delegation::find_by_application(&pool, a.id).await.unwrap().unwrap();
    assert!(record.is_decked());
}

#[actix_web::test]
async fn test_each_stage_action_appends_one_log_entry() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let created = create_application(&pool, 1005, "Decolgen").await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/deck/single/{}", created.id))
        .cookie(cookie.clone())
        .set_json(deck_body("Ana Cruz"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/evaluation/single/{}", created.id))
        .cookie(cookie.clone())
        .set_json(eval_body("Approved", Some("Carl Lim")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/workflow/checker/single/{}", created.id))
        .cookie(cookie)
        .set_json(json!({
            "actor": "Carl Lim",
            "decision": "Checked",
            "next_actor": "Sup Santos",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Checker stage completed successfully");

    let logs = application_log::find_by_application(&pool, created.id).await.unwrap();
    let steps: Vec<&str> = logs.iter().filter_map(|l| l.application_step.as_deref()).collect();
    assert_eq!(steps, vec!["Checking", "Evaluation", "Decking"]);
    assert!(logs.iter().all(|l| l.user_name.as_deref() == Some(common::TEST_USER)));
    assert_eq!(logs[0].application_status.as_deref(), Some("For Supervisor Review"));

    let record = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(record.current_stage(), Some(Stage::Supervisor));
    assert_eq!(record.stage(Stage::Supervisor).actor.as_deref(), Some("Sup Santos"));
}

#[actix_web::test]
async fn test_strict_ordering_blocks_skipped_stage() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let strict = WorkflowEngine::new(&WorkflowConfig { strict_ordering: true });
    let strict_app = test_app!(pool.clone(), strict);
    let lenient_app = test_app!(pool.clone(), WorkflowEngine::default());
    let strict_cookie = session_cookie!(strict_app);
    let lenient_cookie = session_cookie!(lenient_app);
    let created = create_application(&pool, 1006, "Alaxan").await;

    let supervisor = json!({ "actor": "Sup Santos", "decision": "Endorsed" });

    let req = test::TestRequest::patch()
        .uri(&format!("/api/workflow/supervisor/single/{}", created.id))
        .cookie(strict_cookie)
        .set_json(supervisor.clone())
        .to_request();
    let resp = test::call_service(&strict_app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Supervisor stage cannot be completed before the Checker stage");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/workflow/supervisor/single/{}", created.id))
        .cookie(lenient_cookie)
        .set_json(supervisor)
        .to_request();
    assert_eq!(test::call_service(&lenient_app, req).await.status(), StatusCode::OK);

    let record = delegation::find_by_application(&pool, created.id).await.unwrap().unwrap();
    assert!(record.stage(Stage::Supervisor).is_completed());
}

#[actix_web::test]
async fn test_workflow_view_lists_all_stages() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool().clone();
    let app = test_app!(pool.clone(), WorkflowEngine::default());
    let cookie = session_cookie!(app);
    let created = create_application(&pool, 1007, "Kremil-S").await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/workflow/{}", created.id))
        .cookie(cookie)
        .to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(view["is_decked"], false);
    assert_eq!(view["current_stage"], "decker");
    assert_eq!(view["stages"].as_array().unwrap().len(), 7);
    assert_eq!(view["stages"][6]["label"], "Releasing Officer");
}

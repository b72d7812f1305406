//! Shared test infrastructure for the database-backed tests.
//!
//! Each call to `setup_test_db()` creates a fresh Postgres schema on the
//! server named by `DATABASE_URL` and runs the migrations inside it. When
//! `DATABASE_URL` is not set the database tests are skipped.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_session::Session;
use actix_web::HttpResponse;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};

use cdrr_engine::auth::session;
use cdrr_engine::db;
use cdrr_engine::models::application::{self, Application, ApplicationInput};
use cdrr_engine::models::user::Role;

/// Build the full route table around `$pool`, plus a `/test/sign-in` route
/// that starts a session without touching the database.
#[allow(unused_macros)]
macro_rules! test_app {
    ($pool:expr, $engine:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(cdrr_engine::auth::session_middleware(actix_web::cookie::Key::from(&[7u8; 64][..])))
                .app_data(actix_web::web::Data::new($pool))
                .app_data(actix_web::web::Data::new($engine))
                .route("/test/sign-in", actix_web::web::post().to(common::test_sign_in))
                .configure(cdrr_engine::handlers::configure),
        )
        .await
    };
}

/// Session cookie for an app built with `test_app!`.
#[allow(unused_macros)]
macro_rules! session_cookie {
    ($app:expr) => {{
        let req = actix_web::test::TestRequest::post().uri("/test/sign-in").to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert!(resp.status().is_success(), "test sign-in failed");
        resp.response()
            .cookies()
            .find(|c| c.name() == "cdrr_session")
            .expect("session cookie")
            .into_owned()
    }};
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const TEST_USER: &str = "tester";

pub struct TestDb {
    pool: PgPool,
    pub schema: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub async fn setup_test_db() -> Option<TestDb> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())?;

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let schema = format!(
        "cdrr_test_{}_{}_{}",
        std::process::id(),
        nanos % 1_000_000_000,
        COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    let mut admin = PgConnection::connect(&url).await.expect("connect to test database");
    admin
        .execute(format!("CREATE SCHEMA {schema}").as_str())
        .await
        .expect("create test schema");
    admin.close().await.expect("close admin connection");

    let search_path = format!("SET search_path TO {schema}");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                conn.execute(search_path.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("connect test pool");

    db::run_migrations(&pool).await.expect("run migrations");
    Some(TestDb { pool, schema })
}

/// Input with a DTN and brand name, the minimum most tests need.
pub fn input(dtn: i64, brand: &str) -> ApplicationInput {
    let mut input = ApplicationInput { dtn: Some(dtn), ..Default::default() };
    input.details.prod_br_name = Some(brand.to_string());
    input
}

pub async fn create_application(pool: &PgPool, dtn: i64, brand: &str) -> Application {
    application::create(pool, &input(dtn, brand), Some(TEST_USER))
        .await
        .expect("create application")
}

pub async fn test_sign_in(session: Session) -> HttpResponse {
    match session::sign_in(&session, 1, TEST_USER, Role::User) {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

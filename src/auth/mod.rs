pub mod middleware;
pub mod password;
pub mod session;
pub mod validate;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;

/// Cookie-backed session layer shared by the server and the HTTP tests.
pub fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("cdrr_session".to_string())
        .cookie_secure(false)
        .cookie_http_only(true)
        .build()
}

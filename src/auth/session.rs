use std::future::{Ready, ready};

use actix_session::{Session, SessionExt};
use actix_web::{FromRequest, HttpRequest, dev::Payload};

use crate::errors::AppError;
use crate::models::user::Role;

const USER_ID_KEY: &str = "user_id";
const USERNAME_KEY: &str = "username";
const ROLE_KEY: &str = "role";

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID_KEY).unwrap_or(None)
}

pub fn get_username(session: &Session) -> Result<String, String> {
    match session.get::<String>(USERNAME_KEY) {
        Ok(Some(username)) => Ok(username),
        Ok(None) => Err("No username in session".to_string()),
        Err(e) => Err(format!("Session error: {e}")),
    }
}

/// Role recorded at sign-in. Missing or unreadable values count as `User`.
pub fn get_role(session: &Session) -> Role {
    session
        .get::<String>(ROLE_KEY)
        .unwrap_or(None)
        .map_or(Role::User, |r| Role::parse(&r))
}

pub fn sign_in(session: &Session, user_id: i64, username: &str, role: Role) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID_KEY, user_id)
        .and_then(|_| session.insert(USERNAME_KEY, username))
        .and_then(|_| session.insert(ROLE_KEY, role.as_str()))
        .map_err(|e| AppError::Session(e.to_string()))
}

/// Check the session role; returns Err(AppError) if it is not one of `allowed`.
pub fn require_role(session: &Session, allowed: &[Role]) -> Result<(), AppError> {
    let role = get_role(session);
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Access denied. Required role(s): {}",
            allowed.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
        )))
    }
}

pub fn sign_out(session: &Session) {
    session.purge();
}

/// The authenticated caller. Stage actions record `username` as the log author.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

impl CurrentUser {
    pub fn from_session(session: &Session) -> Result<Self, AppError> {
        let id = get_user_id(session)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
        let username = get_username(session).map_err(AppError::Unauthorized)?;
        Ok(CurrentUser { id, username })
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_session(&req.get_session()))
    }
}

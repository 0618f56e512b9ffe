//! # Access Control
//!
//! Runs before every handler. Only the admin tree and the login page are
//! inspected, everything else passes through untouched.
//!
//! | Path | Session | Verdict |
//! |---|---|---|
//! | `/admin/**` | missing or invalid | redirect `/login` |
//! | `/admin/users/**` | valid, not superadmin | redirect `/admin` |
//! | `/admin/**` | valid | pass, [`Session`] attached to the request |
//! | `/login` | valid | redirect `/admin` |
//! | anything else | any | pass |
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use registry::Role;
use tracing::debug;

use crate::{session::Session, state::AppState, utils::session_cookie};

pub const ADMIN_PREFIX: &str = "/admin";
pub const SUPERADMIN_PREFIX: &str = "/admin/users";
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Missing,
    Invalid,
    Valid(Session),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    ToLogin,
    ToAdminHome,
}

impl Verdict {
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Verdict::Pass => None,
            Verdict::ToLogin => Some(LOGIN_PATH),
            Verdict::ToAdminHome => Some(ADMIN_PREFIX),
        }
    }
}

/// `prefix` itself or anything below it, `/administrator` is not under `/admin`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn classify(path: &str, session: &SessionState) -> Verdict {
    if is_under(path, ADMIN_PREFIX) {
        let SessionState::Valid(session) = session else {
            return Verdict::ToLogin;
        };

        if is_under(path, SUPERADMIN_PREFIX) && session.role != Role::Superadmin {
            return Verdict::ToAdminHome;
        }

        return Verdict::Pass;
    }

    if path == LOGIN_PATH && matches!(session, SessionState::Valid(_)) {
        return Verdict::ToAdminHome;
    }

    Verdict::Pass
}

pub async fn access_control(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if !is_under(&path, ADMIN_PREFIX) && path != LOGIN_PATH {
        return next.run(req).await;
    }

    let session = match session_cookie(req.headers()) {
        None => SessionState::Missing,
        Some(token) => match state.sessions.verify_session(&token) {
            Some(session) => SessionState::Valid(session),
            None => SessionState::Invalid,
        },
    };

    let verdict = classify(&path, &session);
    debug!("Access check {path}: {session:?} -> {verdict:?}");

    if let Some(location) = verdict.location() {
        return Redirect::temporary(location).into_response();
    }

    if let SessionState::Valid(session) = session {
        req.extensions_mut().insert(session);
    }

    next.run(req).await
}

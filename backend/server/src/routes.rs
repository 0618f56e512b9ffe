use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use registry::{Candidate, ElectionCenter, upload::existing_documents};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::AppError,
    middleware::{ADMIN_PREFIX, LOGIN_PATH},
    state::AppState,
    utils::{clear_session_cookie, set_session_cookie, verify_password},
};

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignView {
    pub id: String,
    pub name: String,
    pub image_url: String,
}

#[derive(Serialize)]
pub struct DocumentLink {
    pub name: &'static str,
    pub url: String,
}

#[derive(Serialize)]
pub struct CandidateCard {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub sign: Option<SignView>,
    pub documents: Vec<DocumentLink>,
}

#[derive(Serialize)]
pub struct CenterDetail {
    pub center: ElectionCenter,
    pub candidates: Vec<CandidateCard>,
}

pub async fn centers_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ElectionCenter>>, AppError> {
    let centers = state
        .registry
        .centers
        .search(query.q.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(centers))
}

/// A `signId` that no longer resolves shows as no symbol.
pub async fn center_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CenterDetail>, AppError> {
    let center = state
        .registry
        .centers
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("center {id}")))?;

    let signs = state.registry.signs.list().await?;
    let mut candidates = Vec::new();

    for candidate in state.registry.candidates.list_by_center(&center.id).await? {
        let sign = candidate
            .sign_id
            .as_deref()
            .and_then(|sign_id| signs.iter().find(|sign| sign.id == sign_id))
            .map(|sign| SignView {
                id: sign.id.clone(),
                name: sign.name.clone(),
                image_url: sign.resolved_image_url(),
            });

        let documents = existing_documents(&state.config.public_dir, &candidate.id)
            .await
            .into_iter()
            .map(|(doc, url)| DocumentLink {
                name: doc.file_name(),
                url,
            })
            .collect();

        candidates.push(CandidateCard {
            candidate,
            sign,
            documents,
        });
    }

    Ok(Json(CenterDetail { center, candidates }))
}

pub async fn login_page_handler() -> impl IntoResponse {
    "Sign in to manage election centers"
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Unknown user and wrong password answer the same way, after one key derivation each.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = state.registry.users.get_by_username(&form.username).await?;
    let stored = match &user {
        Some(user) => user.password_hash.clone(),
        None => state.decoy_hash.clone(),
    };

    let verified = verify_password(state.credentials, form.password, stored).await?;

    let Some(user) = user.filter(|_| verified) else {
        warn!("Rejected login attempt");
        return Err(AppError::InvalidCredentials);
    };

    let token = state.sessions.sign_session(&user.id, user.role)?;
    let cookie = set_session_cookie(&token, state.config.production)?;

    info!("Login successful for {}", user.username);

    Ok(([(SET_COOKIE, cookie)], Redirect::to(ADMIN_PREFIX)).into_response())
}

pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let cookie = clear_session_cookie(state.config.production)?;

    Ok(([(SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response())
}

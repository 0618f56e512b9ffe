//! # Admin Handlers
//!
//! Everything here sits behind [`crate::middleware::access_control`], so an
//! [`Extension<Session>`] is always attached.
//!
//! Candidate files are written after the record exists because their folder is
//! named after the generated id. A failed upload leaves the record and any file
//! already written in place and reports the error.
use std::{collections::HashSet, sync::Arc};

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use registry::{
    Candidate, CandidateDraft, CandidatePatch, CenterDraft, CenterPatch, ElectionCenter, Role,
    Sign, SignDraft, UserDraft, UserPatch, UserSummary,
    models::SYMBOLS_FOLDER,
    upload::{CandidateDocument, candidate_folder, save_uploaded_file},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError::{self, Forbidden, IncorrectPassword, MalformedPayload, NotFound},
    middleware::LOGIN_PATH,
    session::Session,
    state::AppState,
    utils::{MultipartForm, hash_password, read_multipart, verify_password},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_centers: usize,
    pub total_candidates: usize,
    pub total_parties: usize,
}

pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Dashboard>, AppError> {
    let centers = state.registry.centers.list().await?;
    let candidates = state.registry.candidates.list().await?;
    let parties: HashSet<&str> = candidates.iter().map(|c| c.party.as_str()).collect();

    Ok(Json(Dashboard {
        total_centers: centers.len(),
        total_candidates: candidates.len(),
        total_parties: parties.len(),
    }))
}

// Centers

pub async fn list_centers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ElectionCenter>>, AppError> {
    Ok(Json(state.registry.centers.list().await?))
}

pub async fn create_center_handler(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<CenterDraft>,
) -> Result<Response, AppError> {
    if draft.name.trim().is_empty() {
        return Err(MalformedPayload("name is required".to_string()));
    }

    let center = state.registry.centers.create(draft).await?;

    Ok((StatusCode::CREATED, Json(center)).into_response())
}

pub async fn get_center_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ElectionCenter>, AppError> {
    state
        .registry
        .centers
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFound(format!("center {id}")))
}

pub async fn update_center_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<CenterPatch>,
) -> Result<Json<ElectionCenter>, AppError> {
    state
        .registry
        .centers
        .update(&id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| NotFound(format!("center {id}")))
}

/// Candidates assigned to the center are left as they are.
pub async fn delete_center_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(state.registry.centers.delete(&id).await?, "center", &id)
}

// Candidates

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFilter {
    center_id: Option<String>,
}

pub async fn list_candidates_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<Candidate>>, AppError> {
    let candidates = match filter.center_id {
        Some(center_id) => state.registry.candidates.list_by_center(&center_id).await?,
        None => state.registry.candidates.list().await?,
    };

    Ok(Json(candidates))
}

pub async fn get_candidate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Candidate>, AppError> {
    state
        .registry
        .candidates
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFound(format!("candidate {id}")))
}

pub async fn create_candidate_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_multipart(multipart).await?;

    let draft = CandidateDraft::new(
        form.required("name")?,
        form.text("party").unwrap_or_default(),
        form.text("photoUrl").map(str::to_string),
        form.required("assignedCenterId")?,
        form.text("signId").map(str::to_string),
    );

    let mut candidate = state.registry.candidates.create(draft).await?;

    if let Some(photo_url) = save_candidate_documents(&state, &candidate.id, &form).await? {
        let patch = CandidatePatch {
            photo_url: Some(photo_url),
            ..Default::default()
        };

        if let Some(updated) = state.registry.candidates.update(&candidate.id, patch).await? {
            candidate = updated;
        }
    }

    Ok((StatusCode::CREATED, Json(candidate)).into_response())
}

/// Absent fields are kept; an empty `signId` clears the symbol.
pub async fn update_candidate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Candidate>, AppError> {
    let form = read_multipart(multipart).await?;

    if state.registry.candidates.get_by_id(&id).await?.is_none() {
        return Err(NotFound(format!("candidate {id}")));
    }

    let mut patch = CandidatePatch {
        name: non_empty(form.text("name")),
        party: form.text("party").map(str::to_string),
        photo_url: non_empty(form.text("photoUrl")),
        assigned_center_id: non_empty(form.text("assignedCenterId")),
        sign_id: form.text("signId").map(|sign_id| non_empty(Some(sign_id))),
    };

    if let Some(photo_url) = save_candidate_documents(&state, &id, &form).await? {
        patch.photo_url = Some(photo_url);
    }

    state
        .registry
        .candidates
        .update(&id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| NotFound(format!("candidate {id}")))
}

pub async fn delete_candidate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(state.registry.candidates.delete(&id).await?, "candidate", &id)
}

/// Saves every submitted document under `candidates/<id>/` and returns the
/// profile image path when one was uploaded.
async fn save_candidate_documents(
    state: &AppState,
    candidate_id: &str,
    form: &MultipartForm,
) -> Result<Option<String>, AppError> {
    let folder = candidate_folder(candidate_id);
    let mut photo_url = None;

    for doc in CandidateDocument::ALL {
        let Some(file) = form.file(doc.field()) else {
            continue;
        };

        let path = save_uploaded_file(
            &state.config.public_dir,
            &file.bytes,
            &file.file_name,
            &folder,
            Some(doc.file_name()),
        )
        .await?;

        if doc == CandidateDocument::ProfileImage {
            photo_url = Some(path);
        }
    }

    Ok(photo_url)
}

// Signs

pub async fn list_signs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Sign>>, AppError> {
    Ok(Json(state.registry.signs.list().await?))
}

/// Uploaded images are stored as bare filenames, resolved under `/symbols/`.
pub async fn create_sign_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_multipart(multipart).await?;
    let name = form.required("name")?;

    let image_url = match form.file("imageFile") {
        Some(file) => {
            let path = save_uploaded_file(
                &state.config.public_dir,
                &file.bytes,
                &file.file_name,
                SYMBOLS_FOLDER,
                None,
            )
            .await?;

            path.rsplit('/').next().unwrap_or_default().to_string()
        }
        None => form.text("imageUrl").unwrap_or_default().to_string(),
    };

    let sign = state
        .registry
        .signs
        .create(SignDraft { name, image_url })
        .await?;

    Ok((StatusCode::CREATED, Json(sign)).into_response())
}

/// Candidates keep their now dangling `signId`.
pub async fn delete_sign_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(state.registry.signs.delete(&id).await?, "sign", &id)
}

// Users

#[derive(Deserialize)]
pub struct NewUser {
    username: String,
    password: String,
    role: Role,
}

pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = state.registry.users.list().await?;

    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(new_user): Json<NewUser>,
) -> Result<Response, AppError> {
    let username = new_user.username.trim().to_string();

    if username.is_empty() || new_user.password.is_empty() {
        return Err(MalformedPayload(
            "username and password are required".to_string(),
        ));
    }

    let password_hash = hash_password(state.credentials, new_user.password).await?;
    let user = state
        .registry
        .users
        .create_user(UserDraft {
            username,
            password_hash,
            role: new_user.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))).into_response())
}

pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ensure_not_superadmin(&state, &id).await?;

    deleted(state.registry.users.delete(&id).await?, "user", &id)
}

pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ensure_not_superadmin(&state, &id).await?;

    let reset_to = state.config.reset_password.clone();
    let password_hash = hash_password(state.credentials, reset_to.clone()).await?;
    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..Default::default()
    };

    state
        .registry
        .users
        .update(&id, patch)
        .await?
        .ok_or_else(|| NotFound(format!("user {id}")))?;

    info!("Password reset for user {id}");

    Ok(Json(json!({ "message": format!("Password reset to {reset_to}") })))
}

/// The repository accepts any id, superadmin accounts are shielded here.
async fn ensure_not_superadmin(state: &AppState, id: &str) -> Result<(), AppError> {
    let user = state
        .registry
        .users
        .get_by_id(id)
        .await?
        .ok_or_else(|| NotFound(format!("user {id}")))?;

    if user.role == Role::Superadmin {
        return Err(Forbidden("superadmin accounts cannot be changed here".to_string()));
    }

    Ok(())
}

// Profile

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    current_password: String,
    new_password: String,
}

pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(change): Json<PasswordChange>,
) -> Result<Response, AppError> {
    let Some(user) = state.registry.users.get_by_id(&session.user_id).await? else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    if change.new_password.is_empty() {
        return Err(MalformedPayload("newPassword is required".to_string()));
    }

    if !verify_password(state.credentials, change.current_password, user.password_hash).await? {
        return Err(IncorrectPassword);
    }

    let password_hash = hash_password(state.credentials, change.new_password).await?;
    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    if state.registry.users.update(&user.id, patch).await?.is_none() {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    Ok(Json(json!({ "success": "Password updated successfully" })).into_response())
}

fn deleted(removed: bool, kind: &str, id: &str) -> Result<StatusCode, AppError> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(NotFound(format!("{kind} {id}")))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

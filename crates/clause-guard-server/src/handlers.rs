//! HTTP handlers

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use clause_guard_core::AnalysisResult;
use tracing::{info, warn};

use crate::auth::{self, AdminUser, CurrentUser, MaybeUser};
use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::upload::{self, UploadedDocument};

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let email = auth::normalize_email(&req.email);
    auth::validate_username(&req.username)?;
    auth::validate_email(&email)?;
    auth::validate_password(&req.password, &req.confirm_password)?;

    let password_hash = auth::hash_password(req.password).await?;
    let user = state
        .db
        .create_user(&req.username, &email, &password_hash)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::UserExists,
            other => ApiError::Database(other),
        })?;

    info!(user_id = user.id, username = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = auth::normalize_email(&req.email);
    let Some(user) = state.db.find_user_by_email(&email).await? else {
        warn!(%email, "login for unknown email");
        return Err(ApiError::InvalidCredentials);
    };
    if !auth::verify_password(req.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let now = Utc::now();
    state.db.purge_expired_sessions(now).await?;

    let ttl = state.settings.session_ttl;
    let expires_at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .context("session_ttl out of range for timestamps")?;
    let token = auth::new_session_token();
    state
        .db
        .create_session(&auth::hash_token(&token), user.id, expires_at)
        .await?;

    info!(user_id = user.id, "user logged in");
    let cookie = auth::session_cookie(&token, ttl.as_secs(), state.settings.secure_cookies);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            expires_at,
            user: user.into(),
        }),
    ))
}

/// Revoke the caller's session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_session(&current.token_hash).await?;
    info!(user_id = current.user.id, "user logged out");
    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            auth::clear_session_cookie(state.settings.secure_cookies),
        )],
    ))
}

/// The caller's analysis history, newest first
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let logs = state.db.logs_for_user(current.user.id).await?;
    Ok(Json(DashboardResponse {
        user: current.user,
        logs: logs.into_iter().map(AnalysisLogView::from).collect(),
    }))
}

/// Score an uploaded document; signed-in callers get the result stored
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    MaybeUser(current): MaybeUser,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let UploadedDocument {
        filename,
        format,
        bytes,
    } = upload::read_document(multipart, state.settings.max_upload_bytes).await?;

    let scorer = Arc::clone(&state.scorer);
    let result = tokio::task::spawn_blocking(move || {
        format
            .extract_text(&bytes)
            .map(|text| scorer.score(&text))
    })
    .await
    .context("analysis task failed")??;

    match current {
        Some(current) => {
            let log_id = state
                .db
                .insert_log(
                    current.user.id,
                    &filename,
                    Utc::now(),
                    result.risk_score,
                    &result.joined_highlights(),
                )
                .await?;
            info!(
                log_id,
                user_id = current.user.id,
                %filename,
                risk_score = result.risk_score,
                "stored analysis"
            );
        }
        None => info!(%filename, risk_score = result.risk_score, "anonymous analysis"),
    }

    Ok(Json(result))
}

/// Delete one of the caller's analysis logs
pub async fn delete_log(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let log = state
        .db
        .find_log(id)
        .await?
        .ok_or(ApiError::LogNotFound(id))?;
    if log.user_id != current.user.id {
        warn!(log_id = id, user_id = current.user.id, "refused to delete foreign log");
        return Err(ApiError::Forbidden(
            "You do not have permission to delete this log.",
        ));
    }
    state.db.delete_log(id).await?;
    info!(log_id = id, user_id = current.user.id, "deleted analysis log");
    Ok(StatusCode::NO_CONTENT)
}

/// All users and all analyses, for administrators
pub async fn admin(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<AdminResponse>, ApiError> {
    let users = state.db.list_users().await?;
    let analyses = state.db.all_logs().await?;
    Ok(Json(AdminResponse {
        users: users.into_iter().map(UserProfile::from).collect(),
        analyses: analyses.into_iter().map(AnalysisLogView::from).collect(),
    }))
}

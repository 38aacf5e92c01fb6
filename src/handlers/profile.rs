use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{ApprovalStatus, User};
use crate::services::policy;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    user: User,
    can_request_provider: bool,
}

// GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProfileResponse>, AppError> {
    if !state.auth.is_authenticated() {
        return Err(AppError::Unauthorized);
    }

    let user = match state.auth.current_user() {
        Some(user) => user,
        None => state.auth.fetch_profile().await?,
    };
    Ok(Json(ProfileResponse {
        can_request_provider: policy::can_request_provider(&user),
        user,
    }))
}

#[derive(Serialize)]
pub struct ProviderRequestResponse {
    message: Option<String>,
    status: ApprovalStatus,
}

// POST /api/profile/request-provider
pub async fn request_provider(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProviderRequestResponse>, AppError> {
    if !state.auth.is_authenticated() {
        return Err(AppError::Unauthorized);
    }

    let message = state.auth.request_provider().await?;
    Ok(Json(ProviderRequestResponse {
        message,
        status: ApprovalStatus::Pending,
    }))
}

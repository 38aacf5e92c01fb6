use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppError;
use crate::notify::Notification;
use crate::state::AppState;

// GET /api/notifications
pub async fn list_notifications(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(state.notifications.list())
}

// POST /api/notifications/:id/dismiss
pub async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.notifications.dismiss(id) {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("notification {id}")))
    }
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, EntityId, Role, StatusChange};
use crate::services::policy::{available_actions, BookingAction};
use crate::services::stats::{filter_by_status, StatusFilter};
use crate::state::AppState;
use crate::stores::BookingScope;

use super::wants_refresh;

/// Loads the caller's bookings when asked to or when none have been loaded.
/// Failures stay in the store's `error` for the page to render.
pub(crate) async fn ensure_bookings(state: &AppState, refresh: Option<bool>) {
    let loaded = state.bookings.snapshot().last_scope.is_some();
    if !wants_refresh(refresh, loaded) {
        return;
    }

    // a restored session carries a role but no user
    let mut user = state.auth.current_user();
    if user.is_none() && state.auth.is_authenticated() {
        match state.auth.fetch_profile().await {
            Ok(profile) => user = Some(profile),
            Err(e) => tracing::warn!(error = %e, "failed to load profile"),
        }
    }

    let role = state.auth.role();
    if role == Some(Role::Customer) && user.is_none() {
        tracing::warn!("customer profile unknown, not loading bookings");
        return;
    }

    let scope = BookingScope::for_role(role, user.map(|u| u.id));
    if let Err(e) = state.bookings.fetch(scope).await {
        tracing::warn!(error = %e, ?scope, "failed to load bookings");
    }
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Serialize)]
pub struct BookingRow {
    #[serde(flatten)]
    booking: Booking,
    actions: Vec<BookingAction>,
    highlighted: bool,
}

#[derive(Serialize)]
pub struct BookingsResponse {
    bookings: Vec<BookingRow>,
    total: usize,
    loading: bool,
    error: Option<String>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> Json<BookingsResponse> {
    ensure_bookings(&state, query.refresh).await;

    let snapshot = state.bookings.snapshot();
    let user = state.auth.current_user();
    let filter = query
        .status
        .as_deref()
        .map(StatusFilter::parse)
        .unwrap_or_default();

    let bookings: Vec<BookingRow> = filter_by_status(snapshot.bookings.as_slice(), &filter)
        .into_iter()
        .map(|b| BookingRow {
            actions: user
                .as_ref()
                .map(|u| available_actions(b, u))
                .unwrap_or_default(),
            highlighted: snapshot.recently_updated_id == Some(b.id),
            booking: b.clone(),
        })
        .collect();

    Json(BookingsResponse {
        total: snapshot.bookings.len(),
        bookings,
        loading: snapshot.lifecycle.loading,
        error: snapshot.lifecycle.error,
    })
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub message: Option<String>,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Booking>, AppError> {
    let change = StatusChange {
        status: BookingStatus::parse(&body.status),
        message: body.message.filter(|m| !m.trim().is_empty()),
    };

    let booking = state
        .bookings
        .update_status(id, change, state.auth.role())
        .await?;
    Ok(Json(booking))
}

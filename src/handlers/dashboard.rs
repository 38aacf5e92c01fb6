use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::services::stats::{DayCount, Dashboard, Period, ProviderStats, StatusShare, Summary};
use crate::state::AppState;

use super::bookings::ensure_bookings;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Serialize)]
pub struct ProviderRow {
    #[serde(flatten)]
    stats: ProviderStats,
    pending_pct: u32,
    completed_pct: u32,
}

impl From<ProviderStats> for ProviderRow {
    fn from(stats: ProviderStats) -> Self {
        Self {
            pending_pct: stats.pending_pct(),
            completed_pct: stats.completed_pct(),
            stats,
        }
    }
}

#[derive(Serialize)]
pub struct DashboardResponse {
    period: Period,
    summary: Summary,
    percentages: Vec<StatusShare>,
    providers: Vec<ProviderRow>,
    top_performers: Vec<ProviderRow>,
    by_day: Vec<DayCount>,
    loading: bool,
    error: Option<String>,
}

// GET /api/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardResponse> {
    ensure_bookings(&state, query.refresh).await;

    let period = query
        .period
        .as_deref()
        .map(Period::parse)
        .unwrap_or_default();
    let snapshot = state.bookings.snapshot();
    let dashboard = Dashboard::build(snapshot.bookings.as_slice(), period, Utc::now());

    Json(DashboardResponse {
        period: dashboard.period,
        summary: dashboard.summary,
        percentages: dashboard.percentages,
        providers: dashboard.providers.into_iter().map(ProviderRow::from).collect(),
        top_performers: dashboard
            .top_performers
            .into_iter()
            .map(ProviderRow::from)
            .collect(),
        by_day: dashboard.by_day,
        loading: snapshot.lifecycle.loading,
        error: snapshot.lifecycle.error,
    })
}

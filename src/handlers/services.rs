use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::Service;
use crate::services::catalog::{self, Page, PAGE_SIZE};
use crate::state::AppState;

use super::wants_refresh;

// GET /api/services
#[derive(Deserialize)]
pub struct ServicesQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub refresh: Option<bool>,
}

#[derive(Clone, Serialize)]
pub struct ServiceRow {
    #[serde(flatten)]
    service: Service,
    image_src: Option<String>,
}

#[derive(Serialize)]
pub struct ServicesResponse {
    categories: Vec<String>,
    services: Page<ServiceRow>,
    loading: bool,
    error: Option<String>,
}

pub async fn get_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServicesQuery>,
) -> Json<ServicesResponse> {
    let loaded = !state.services.snapshot().services.is_empty();
    if wants_refresh(query.refresh, loaded) {
        if let Err(e) = state.services.fetch_all().await {
            tracing::warn!(error = %e, "failed to load services");
        }
    }

    let snapshot = state.services.snapshot();
    let all = snapshot.services.as_slice();
    let rows: Vec<ServiceRow> =
        catalog::filter_services(all, query.category.as_deref(), query.search.as_deref())
            .into_iter()
            .map(|s| ServiceRow {
                image_src: state.services.image_url(s),
                service: s.clone(),
            })
            .collect();

    Json(ServicesResponse {
        categories: catalog::categories(all),
        services: catalog::paginate(&rows, query.page.unwrap_or(1), PAGE_SIZE),
        loading: snapshot.lifecycle.loading,
        error: snapshot.lifecycle.error,
    })
}

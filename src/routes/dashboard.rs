use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::AppError,
    services::{
        dashboard::{DashboardFilter, DashboardService, DashboardSummary},
        metrics,
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub filter: Option<String>,
}

/// GET /: counters plus the event list picked by `?filter=`.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let today = Utc::now().date_naive();
    let keyword = query.filter.as_deref();

    let summary = DashboardService::summary(
        state.repos.categories.as_ref(),
        state.repos.events.as_ref(),
        state.repos.participants.as_ref(),
        today,
        keyword,
    )
    .await?;

    metrics::record_dashboard_view(DashboardFilter::from_keyword(keyword).as_str());
    Ok(Json(summary))
}

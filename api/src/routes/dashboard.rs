use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use nosh_core::aggregate::{aggregate, DashboardSummary};
use nosh_core::error::ApiError;

use crate::error::AppError;
use crate::identity::require_user_id;
use crate::state::AppState;
use crate::store;
use crate::window;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DashboardParams {
    /// Window start (ISO calendar date, inclusive). Defaults to six days
    /// before `end`.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Window end (ISO calendar date, inclusive). Defaults to today.
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

/// Dashboard summary for a date window
///
/// Aggregates the user's food logs over the window (default: the trailing
/// seven days ending today) into daily consumed/burned buckets, totals, and
/// a goal-progress score. Always returns a well-formed summary — a user with
/// no logs gets all-zero buckets.
#[utoipa::path(
    get,
    path = "/v1/dashboard",
    params(
        DashboardParams,
        ("x-user-id" = uuid::Uuid, Header, description = "User ID")
    ),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardSummary>, AppError> {
    let user_id = require_user_id(&headers)?;

    let window = window::resolve_window(params.start, params.end, window::today_in(state.tz))?;
    let (from, to) = window::bounds_utc(window, state.tz);

    let records = store::fetch_logs_in_range(&state.db, user_id, from, to).await?;
    let profile = store::fetch_profile(&state.db, user_id).await?;

    Ok(Json(aggregate(&records, &profile, window)))
}

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use nosh_core::aggregate::ProgressStatus;
use nosh_core::error::ApiError;
use nosh_core::records::{resolve_calories, Goal, CALORIE_KEY_PRIORITY};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::require_user_id;
use crate::state::AppState;
use crate::store;
use crate::window;

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/progress", post(save_progress))
}

pub fn read_router() -> Router<AppState> {
    Router::new().route("/v1/progress", get(get_progress))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveProgressRequest {
    /// e.g. "daily", "3_per_week", "never"
    pub workout_frequency: String,
    pub calories_per_workout: f64,
    /// "lose", "maintain", or "gain"
    pub goal: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SaveProgressResponse {
    pub workout_frequency: String,
    pub calories_per_workout: f64,
    pub goal: String,
}

/// Save or update the user's workout profile
///
/// Upserts the single `user_progress` row for this user. The frequency and
/// goal strings are stored as given; reads parse them leniently.
#[utoipa::path(
    post,
    path = "/v1/progress",
    request_body = SaveProgressRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Progress saved", body = SaveProgressResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "progress"
)]
pub async fn save_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(&headers)?;
    validate_save_request(&req)?;

    sqlx::query(
        r#"
        INSERT INTO user_progress (user_id, workout_frequency, calories_per_workout, goal)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE
        SET workout_frequency = EXCLUDED.workout_frequency,
            calories_per_workout = EXCLUDED.calories_per_workout,
            goal = EXCLUDED.goal
        "#,
    )
    .bind(user_id)
    .bind(&req.workout_frequency)
    .bind(req.calories_per_workout)
    .bind(&req.goal)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::OK,
        Json(SaveProgressResponse {
            workout_frequency: req.workout_frequency,
            calories_per_workout: req.calories_per_workout,
            goal: req.goal,
        }),
    ))
}

fn validate_save_request(req: &SaveProgressRequest) -> Result<(), AppError> {
    if req.workout_frequency.trim().is_empty() {
        return Err(AppError::Validation {
            message: "workout_frequency must not be empty".to_string(),
            field: Some("workout_frequency".to_string()),
            received: None,
            docs_hint: Some("Use \"daily\", \"3_per_week\", or \"never\"".to_string()),
        });
    }
    if !req.calories_per_workout.is_finite() || req.calories_per_workout < 0.0 {
        return Err(AppError::Validation {
            message: "calories_per_workout must be a non-negative number".to_string(),
            field: Some("calories_per_workout".to_string()),
            received: Some(serde_json::json!(req.calories_per_workout)),
            docs_hint: None,
        });
    }
    if req.goal.trim().is_empty() {
        return Err(AppError::Validation {
            message: "goal must not be empty".to_string(),
            field: Some("goal".to_string()),
            received: None,
            docs_hint: Some("Use \"lose\", \"maintain\", or \"gain\"".to_string()),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    pub total_consumed: f64,
    pub total_burned: f64,
    pub net_calories: f64,
    pub goal: Goal,
    pub status: ProgressStatus,
}

/// Sign-based progress check over the trailing week
///
/// The simpler companion to the dashboard score: the same net-calories value
/// classified by sign against the goal, with no percentage. A user the store
/// has never seen gets zero totals and a neutral status.
#[utoipa::path(
    get,
    path = "/v1/progress",
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Progress status", body = ProgressResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "progress"
)]
pub async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, AppError> {
    let user_id = require_user_id(&headers)?;

    let window = window::resolve_window(None, None, window::today_in(state.tz))?;
    let (from, to) = window::bounds_utc(window, state.tz);
    let records = store::fetch_logs_in_range(&state.db, user_id, from, to).await?;
    let profile = store::fetch_profile(&state.db, user_id).await?;

    let total_consumed: f64 = records
        .iter()
        .filter(|record| window.contains(record.effective_date()))
        .map(|record| resolve_calories(record, &CALORIE_KEY_PRIORITY))
        .sum();

    let total_burned = profile.calories_per_workout.max(0.0)
        * f64::from(profile.workout_frequency.workouts_per_week());
    let net_calories = total_consumed - total_burned;

    Ok(Json(ProgressResponse {
        total_consumed,
        total_burned,
        net_calories,
        goal: profile.goal,
        status: ProgressStatus::classify(profile.goal, net_calories),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(freq: &str, calories: f64, goal: &str) -> SaveProgressRequest {
        SaveProgressRequest {
            workout_frequency: freq.to_string(),
            calories_per_workout: calories,
            goal: goal.to_string(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_save_request(&request("daily", 300.0, "lose")).is_ok());
    }

    #[test]
    fn blank_frequency_is_rejected() {
        let err = validate_save_request(&request("  ", 300.0, "lose")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn negative_calories_are_rejected() {
        let err = validate_save_request(&request("daily", -10.0, "lose")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn non_finite_calories_are_rejected() {
        let err = validate_save_request(&request("daily", f64::NAN, "lose")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

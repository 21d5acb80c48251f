use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use nosh_core::error::ApiError;
use nosh_core::extraction::{extract, ExtractKind};
use nosh_core::payload::{validate, MealPlan, Payload, PayloadKind};

use crate::ai::CompletionRequest;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::require_user_id;
use crate::state::AppState;

const PLANNER_SYSTEM_PROMPT: &str =
    "You are a professional dietitian. Respond ONLY with valid JSON.";

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/ai/meal-plan", post(generate_meal_plan))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MealPlanRequest {
    pub bmi: f64,
    /// "lose", "maintain", or "gain"
    pub goal: String,
    pub gender: String,
}

fn planner_prompt(bmi: f64, goal: &str, gender: &str) -> String {
    format!(
        "You are a certified nutritionist and chef specializing in Bangladeshi cuisine.\n\
         Generate a healthy, culturally relevant daily food plan based on:\n\
         \n\
         - BMI: {bmi}\n\
         - Goal: {goal}\n\
         - Gender: {gender}\n\
         \n\
         Return ONLY valid JSON in this format:\n\
         {{\n\
           \"breakfast\": {{ \"items\": [\"Item 1\", \"Item 2\"], \"calories\": \"XXX kcal\" }},\n\
           \"lunch\": {{ \"items\": [\"Item 1\", \"Item 2\"], \"calories\": \"XXX kcal\" }},\n\
           \"snacks\": {{ \"items\": [\"Item 1\", \"Item 2\"], \"calories\": \"XXX kcal\" }},\n\
           \"dinner\": {{ \"items\": [\"Item 1\", \"Item 2\"], \"calories\": \"XXX kcal\" }},\n\
           \"nutrition_summary\": \"Short daily nutrition summary\"\n\
         }}"
    )
}

/// Generate a daily meal plan
///
/// Asks the model for a full-day plan matching the user's BMI, goal, and
/// gender, then recovers and validates the `MealPlan` payload from the
/// completion. The plan is returned as-is, never persisted here.
#[utoipa::path(
    post,
    path = "/v1/ai/meal-plan",
    request_body = MealPlanRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Generated meal plan", body = MealPlan),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Model failure", body = ApiError)
    ),
    tag = "ai"
)]
pub async fn generate_meal_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<MealPlanRequest>,
) -> Result<Json<MealPlan>, AppError> {
    require_user_id(&headers)?;
    validate_profile_fields(req.bmi, &req.goal, &req.gender)?;

    let completion = state
        .ai
        .complete(CompletionRequest {
            system: Some(PLANNER_SYSTEM_PROMPT.to_string()),
            prompt: planner_prompt(req.bmi, &req.goal, &req.gender),
            temperature: 0.6,
            max_tokens: Some(1500),
        })
        .await?;

    let value = extract(&completion, ExtractKind::Object)?;
    match validate(&value, PayloadKind::MealPlan)? {
        Payload::MealPlan(plan) => Ok(Json(plan)),
        _ => Err(AppError::Internal(
            "validator returned a foreign payload kind".to_string(),
        )),
    }
}

/// Shared request check for the AI endpoints fed from the profile form.
pub fn validate_profile_fields(bmi: f64, goal: &str, gender: &str) -> Result<(), AppError> {
    if !bmi.is_finite() || bmi <= 0.0 {
        return Err(AppError::Validation {
            message: "bmi must be a positive number".to_string(),
            field: Some("bmi".to_string()),
            received: Some(serde_json::json!(bmi)),
            docs_hint: None,
        });
    }
    if goal.trim().is_empty() {
        return Err(AppError::Validation {
            message: "goal must not be empty".to_string(),
            field: Some("goal".to_string()),
            received: None,
            docs_hint: Some("Use \"lose\", \"maintain\", or \"gain\"".to_string()),
        });
    }
    if gender.trim().is_empty() {
        return Err(AppError::Validation {
            message: "gender must not be empty".to_string(),
            field: Some("gender".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_profile_values() {
        let prompt = planner_prompt(23.4, "lose", "female");
        assert!(prompt.contains("BMI: 23.4"));
        assert!(prompt.contains("Goal: lose"));
        assert!(prompt.contains("Gender: female"));
        assert!(prompt.contains("\"nutrition_summary\""));
    }

    #[test]
    fn profile_fields_reject_non_positive_bmi() {
        let err = validate_profile_fields(0.0, "lose", "male").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn profile_fields_reject_blank_goal() {
        let err = validate_profile_fields(22.0, " ", "male").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn profile_fields_accept_complete_input() {
        assert!(validate_profile_fields(22.0, "gain", "male").is_ok());
    }
}

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use nosh_core::error::ApiError;
use nosh_core::extraction::{extract, ExtractKind};
use nosh_core::payload::{validate, Payload, PayloadKind};

use crate::ai::CompletionRequest;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::require_user_id;
use crate::routes::meal_plan::validate_profile_fields;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/ai/tips", post(generate_tips))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TipsRequest {
    pub bmi: f64,
    /// "lose", "maintain", or "gain"
    pub goal: String,
    pub gender: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TipsResponse {
    pub tips: Vec<String>,
}

fn tips_prompt(bmi: f64, goal: &str, gender: &str) -> String {
    format!(
        "You are a professional nutritionist. Based on the following profile:\n\
         - BMI: {bmi}\n\
         - Goal: {goal}\n\
         - Gender: {gender}\n\
         \n\
         Generate 4 short, motivational health tips.\n\
         Keep them simple, positive, and human-like.\n\
         Example: \"Drink at least 2.5L of water daily — hydration boosts metabolism.\"\n\
         Return only a valid JSON array of strings, nothing else."
    )
}

/// Generate short health tips
///
/// Unlike the other AI endpoints, an unusable completion here degrades to an
/// empty tip list: tips are decorative, and the dashboard rendering them
/// should not fail because the model rambled. The failure kind is still
/// logged. Transport failures remain a 502.
#[utoipa::path(
    post,
    path = "/v1/ai/tips",
    request_body = TipsRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Generated tips (possibly empty)", body = TipsResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Model unreachable", body = ApiError)
    ),
    tag = "ai"
)]
pub async fn generate_tips(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<TipsRequest>,
) -> Result<Json<TipsResponse>, AppError> {
    require_user_id(&headers)?;
    validate_profile_fields(req.bmi, &req.goal, &req.gender)?;

    let completion = state
        .ai
        .complete(CompletionRequest {
            system: None,
            prompt: tips_prompt(req.bmi, &req.goal, &req.gender),
            temperature: 0.6,
            max_tokens: Some(300),
        })
        .await?;

    let tips = match extract(&completion, ExtractKind::Array) {
        Ok(value) => match validate(&value, PayloadKind::TipList) {
            Ok(Payload::TipList(list)) => list.tips,
            Ok(_) => Vec::new(),
            Err(err) => {
                tracing::warn!(failure_kind = err.code(), error = %err, "tip completion failed validation");
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!(failure_kind = err.code(), error = %err, "tip completion had no JSON array");
            Vec::new()
        }
    };

    Ok(Json(TipsResponse { tips }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_profile_values() {
        let prompt = tips_prompt(27.1, "maintain", "male");
        assert!(prompt.contains("BMI: 27.1"));
        assert!(prompt.contains("Goal: maintain"));
        assert!(prompt.contains("JSON array of strings"));
    }
}

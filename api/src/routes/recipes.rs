use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use nosh_core::error::ApiError;
use nosh_core::extraction::{extract, ExtractKind};
use nosh_core::payload::{validate, Payload, PayloadKind, Recipe};

use crate::ai::CompletionRequest;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::require_user_id;
use crate::state::AppState;

const CHEF_SYSTEM_PROMPT: &str = "You are a professional chef. Always respond with ONLY valid JSON. No markdown, no code blocks, no extra text.";

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/ai/recipe", post(generate_recipe))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub dietary_preferences: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub recipe: Recipe,
}

fn chef_prompt(ingredients: &[String], dietary_preferences: Option<&str>) -> String {
    let preferences_line = dietary_preferences
        .map(|prefs| format!("Dietary preferences: {prefs}.\n"))
        .unwrap_or_default();

    format!(
        "Create a detailed recipe using these ingredients: {}.\n\
         {preferences_line}\n\
         Return ONLY valid JSON in this exact format:\n\
         {{\n\
           \"title\": \"Creative recipe name\",\n\
           \"ingredients\": [\n    \"ingredient with precise quantity and preparation notes\"\n  ],\n\
           \"instructions\": [\n    \"Clear step-by-step instruction\"\n  ],\n\
           \"prep_time\": \"X minutes\",\n\
           \"cook_time\": \"X minutes\",\n\
           \"servings\": \"X people\",\n\
           \"difficulty\": \"Easy/Medium/Hard\"\n\
         }}\n\
         \n\
         Important: Return ONLY the JSON object, no additional text, no code blocks, no explanations.",
        ingredients.join(", "),
    )
}

/// Generate a recipe from a list of ingredients
///
/// Recovers and validates a `Recipe` payload from the model completion. An
/// unusable completion is a 502 naming the failure kind.
#[utoipa::path(
    post,
    path = "/v1/ai/recipe",
    request_body = RecipeRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Generated recipe", body = RecipeResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Model failure", body = ApiError)
    ),
    tag = "ai"
)]
pub async fn generate_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<RecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    require_user_id(&headers)?;

    if req.ingredients.is_empty() || req.ingredients.iter().all(|i| i.trim().is_empty()) {
        return Err(AppError::Validation {
            message: "ingredients must contain at least one item".to_string(),
            field: Some("ingredients".to_string()),
            received: None,
            docs_hint: Some("List the ingredients on hand, e.g. [\"chicken\", \"rice\"]".to_string()),
        });
    }

    let completion = state
        .ai
        .complete(CompletionRequest {
            system: Some(CHEF_SYSTEM_PROMPT.to_string()),
            prompt: chef_prompt(&req.ingredients, req.dietary_preferences.as_deref()),
            temperature: 0.7,
            max_tokens: Some(1500),
        })
        .await?;

    let value = extract(&completion, ExtractKind::Object)?;
    match validate(&value, PayloadKind::Recipe)? {
        Payload::Recipe(recipe) => Ok(Json(RecipeResponse { recipe })),
        _ => Err(AppError::Internal(
            "validator returned a foreign payload kind".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_ingredients() {
        let prompt = chef_prompt(
            &["chicken".to_string(), "rice".to_string()],
            Some("halal"),
        );
        assert!(prompt.contains("ingredients: chicken, rice."));
        assert!(prompt.contains("Dietary preferences: halal."));
        assert!(prompt.contains("\"difficulty\""));
    }

    #[test]
    fn prompt_omits_absent_preferences() {
        let prompt = chef_prompt(&["egg".to_string()], None);
        assert!(!prompt.contains("Dietary preferences"));
    }
}

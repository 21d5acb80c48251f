use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nosh_core::error::ApiError;
use nosh_core::extraction::{extract, ExtractKind};
use nosh_core::payload::{validate, CalorieEstimate, Payload, PayloadKind};
use nosh_core::records::{resolve_calorie_fields, PaginatedResponse, CALORIE_KEY_PRIORITY};

use crate::ai::CompletionRequest;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::identity::require_user_id;
use crate::state::AppState;
use crate::window;

const ESTIMATOR_SYSTEM_PROMPT: &str =
    "You are an expert dietitian. Respond ONLY with valid JSON — no extra text, markdown, or symbols.";

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/food-log/water", patch(add_water))
}

pub fn ai_router() -> Router<AppState> {
    Router::new().route("/v1/food-log", post(log_meal))
}

pub fn read_router() -> Router<AppState> {
    Router::new().route("/v1/food-log", get(list_logs))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LogMealRequest {
    /// e.g. "breakfast", "lunch", "dinner", "snack"
    pub meal_type: String,
    pub food_items: Vec<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

/// One stored food log row, as returned to clients. `calories` is already
/// resolved through the candidate-key list.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FoodLogEntry {
    pub id: Uuid,
    pub meal_type: String,
    pub food_items: Vec<String>,
    pub calories: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_advice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_intake_glasses: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogMealResponse {
    pub log: FoodLogEntry,
    pub estimate: CalorieEstimate,
}

/// The calorie-estimation prompt for one meal.
fn estimator_prompt(meal_type: &str, food_items: &[String], mood: Option<&str>) -> String {
    format!(
        "You are a certified nutritionist.\n\
         Estimate the approximate total calories of the following meal and give ONE short nutrition tip.\n\
         Return ONLY valid JSON in this exact format:\n\
         {{\n  \"approx_calories\": number,\n  \"advice\": \"string\"\n}}\n\
         Meal type: {meal_type}\n\
         Foods: {}\n\
         Mood: {}",
        food_items.join(", "),
        mood.unwrap_or("N/A"),
    )
}

/// Log a meal with an AI calorie estimate
///
/// Sends the meal to the model, recovers and validates a `CalorieEstimate`
/// from the completion, and persists the log row with the estimated calories
/// and advice. An unusable completion is a 502 naming the failure kind — the
/// row is not written.
#[utoipa::path(
    post,
    path = "/v1/food-log",
    request_body = LogMealRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 201, description = "Meal logged", body = LogMealResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Model failure", body = ApiError)
    ),
    tag = "food-log"
)]
pub async fn log_meal(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<LogMealRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user_id(&headers)?;
    validate_log_request(&req)?;

    let completion = state
        .ai
        .complete(CompletionRequest {
            system: Some(ESTIMATOR_SYSTEM_PROMPT.to_string()),
            prompt: estimator_prompt(&req.meal_type, &req.food_items, req.mood.as_deref()),
            temperature: 0.3,
            max_tokens: None,
        })
        .await?;

    let value = extract(&completion, ExtractKind::Object)?;
    let Payload::CalorieEstimate(estimate) = validate(&value, PayloadKind::CalorieEstimate)?
    else {
        return Err(AppError::Internal(
            "validator returned a foreign payload kind".to_string(),
        ));
    };

    let log_date = window::today_in(state.tz);
    let food_items_json = serde_json::json!(req.food_items);

    let row = sqlx::query_as::<_, InsertedRow>(
        r#"
        INSERT INTO food_logs (id, user_id, meal_type, food_items, calories, mood, ai_advice, log_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, created_at
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(&req.meal_type)
    .bind(&food_items_json)
    .bind(estimate.approx_calories)
    .bind(&req.mood)
    .bind(&estimate.advice)
    .bind(log_date)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        user_id = %user_id,
        meal_type = %req.meal_type,
        calories = estimate.approx_calories,
        "meal logged with AI estimate"
    );

    let log = FoodLogEntry {
        id: row.id,
        meal_type: req.meal_type,
        food_items: req.food_items,
        calories: estimate.approx_calories,
        mood: req.mood,
        ai_advice: Some(estimate.advice.clone()),
        water_intake_glasses: None,
        log_date: Some(log_date),
        created_at: row.created_at,
    };

    Ok((StatusCode::CREATED, Json(LogMealResponse { log, estimate })))
}

fn validate_log_request(req: &LogMealRequest) -> Result<(), AppError> {
    if req.meal_type.trim().is_empty() {
        return Err(AppError::Validation {
            message: "meal_type must not be empty".to_string(),
            field: Some("meal_type".to_string()),
            received: None,
            docs_hint: Some("e.g. \"breakfast\", \"lunch\", \"dinner\", \"snack\"".to_string()),
        });
    }
    if req.food_items.is_empty() || req.food_items.iter().all(|item| item.trim().is_empty()) {
        return Err(AppError::Validation {
            message: "food_items must contain at least one item".to_string(),
            field: Some("food_items".to_string()),
            received: None,
            docs_hint: Some("List what was eaten, e.g. [\"rice\", \"dal\"]".to_string()),
        });
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct InsertedRow {
    id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListLogsParams {
    /// Maximum number of logs to return (default 50, max 200)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Cursor for pagination (opaque string from previous response's next_cursor)
    #[serde(default)]
    pub cursor: Option<String>,
}

/// List food logs, newest first
///
/// Cursor-paginated for stable iteration over growing data.
#[utoipa::path(
    get,
    path = "/v1/food-log",
    params(
        ListLogsParams,
        ("x-user-id" = uuid::Uuid, Header, description = "User ID")
    ),
    responses(
        (status = 200, description = "Paginated food logs", body = PaginatedResponse<FoodLogEntry>),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "food-log"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListLogsParams>,
) -> Result<Json<PaginatedResponse<FoodLogEntry>>, AppError> {
    let user_id = require_user_id(&headers)?;

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    // Fetch one extra to determine has_more
    let fetch_limit = limit + 1;

    let cursor = params
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()?;

    let rows = if let Some(cursor) = cursor {
        sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, created_at, log_date, meal_type, food_items, mood, water_intake, ai_advice,
                   to_jsonb(food_logs) AS doc
            FROM food_logs
            WHERE user_id = $1
              AND (created_at, id) < ($2, $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(cursor.created_at)
        .bind(cursor.id)
        .bind(fetch_limit)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, created_at, log_date, meal_type, food_items, mood, water_intake, ai_advice,
                   to_jsonb(food_logs) AS doc
            FROM food_logs
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(fetch_limit)
        .fetch_all(&state.db)
        .await?
    };

    let has_more = rows.len() as i64 > limit;
    let entries: Vec<FoodLogEntry> = rows
        .into_iter()
        .take(limit as usize)
        .map(ListRow::into_entry)
        .collect();

    let next_cursor = if has_more {
        entries
            .last()
            .map(|entry| encode_cursor(&entry.created_at, &entry.id))
    } else {
        None
    };

    Ok(Json(PaginatedResponse {
        data: entries,
        next_cursor,
        has_more,
    }))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddWaterRequest {
    /// Glasses of water to add to today's total. Must be positive.
    pub glasses: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AddWaterResponse {
    pub log_date: NaiveDate,
    pub water_intake_glasses: i32,
}

/// Add water intake to today's log
///
/// Accumulates glasses on today's row, creating a zero-calorie row if the
/// user has not logged anything today.
#[utoipa::path(
    patch,
    path = "/v1/food-log/water",
    request_body = AddWaterRequest,
    params(("x-user-id" = uuid::Uuid, Header, description = "User ID")),
    responses(
        (status = 200, description = "Water intake updated", body = AddWaterResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "food-log"
)]
pub async fn add_water(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<AddWaterRequest>,
) -> Result<Json<AddWaterResponse>, AppError> {
    let user_id = require_user_id(&headers)?;

    if req.glasses <= 0 {
        return Err(AppError::Validation {
            message: "glasses must be a positive integer".to_string(),
            field: Some("glasses".to_string()),
            received: Some(serde_json::json!(req.glasses)),
            docs_hint: None,
        });
    }

    let today = window::today_in(state.tz);

    // Today's earliest row accumulates the water count; a quiet day gets a
    // zero-calorie placeholder row instead.
    let updated = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE food_logs
        SET water_intake = COALESCE(water_intake, 0) + $1
        WHERE id = (
            SELECT id FROM food_logs
            WHERE user_id = $2 AND log_date = $3
            ORDER BY created_at ASC
            LIMIT 1
        )
        RETURNING water_intake
        "#,
    )
    .bind(req.glasses)
    .bind(user_id)
    .bind(today)
    .fetch_optional(&state.db)
    .await?;

    let total = match updated {
        Some(total) => total,
        None => {
            sqlx::query(
                r#"
                INSERT INTO food_logs (id, user_id, meal_type, food_items, calories, ai_advice, water_intake, log_date)
                VALUES ($1, $2, 'Water', $3, 0, 'Stay hydrated', $4, $5)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(serde_json::json!(["Water"]))
            .bind(req.glasses)
            .bind(today)
            .execute(&state.db)
            .await?;
            req.glasses
        }
    };

    Ok(Json(AddWaterResponse {
        log_date: today,
        water_intake_glasses: total,
    }))
}

/// Internal row type for the list query
#[derive(sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    log_date: Option<NaiveDate>,
    meal_type: String,
    food_items: serde_json::Value,
    mood: Option<String>,
    water_intake: Option<i32>,
    ai_advice: Option<String>,
    doc: serde_json::Value,
}

impl ListRow {
    fn into_entry(self) -> FoodLogEntry {
        let calories = self
            .doc
            .as_object()
            .map(|fields| resolve_calorie_fields(fields, &CALORIE_KEY_PRIORITY))
            .unwrap_or(0.0);

        let food_items = match self.food_items {
            serde_json::Value::Array(entries) => entries
                .into_iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect(),
            serde_json::Value::String(s) => vec![s],
            _ => Vec::new(),
        };

        FoodLogEntry {
            id: self.id,
            meal_type: self.meal_type,
            food_items,
            calories,
            mood: self.mood,
            ai_advice: self.ai_advice,
            water_intake_glasses: self.water_intake,
            log_date: self.log_date,
            created_at: self.created_at,
        }
    }
}

/// Cursor is base64("created_at\0id") — opaque to the client, stable for pagination
fn encode_cursor(created_at: &DateTime<Utc>, id: &Uuid) -> String {
    use base64::Engine;
    let raw = format!("{}\0{}", created_at.to_rfc3339(), id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

#[derive(Debug)]
struct CursorData {
    created_at: DateTime<Utc>,
    id: Uuid,
}

fn decode_cursor(cursor: &str) -> Result<CursorData, AppError> {
    use base64::Engine;

    let invalid = |message: &str| AppError::Validation {
        message: message.to_string(),
        field: Some("cursor".to_string()),
        received: None,
        docs_hint: Some("Use the next_cursor value from a previous response".to_string()),
    };

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| invalid("Invalid cursor format"))?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid("Invalid cursor encoding"))?;

    let (timestamp, id) = raw
        .split_once('\0')
        .ok_or_else(|| invalid("Invalid cursor structure"))?;

    let created_at = DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid("Invalid cursor timestamp"))?;
    let id = Uuid::parse_str(id).map_err(|_| invalid("Invalid cursor id"))?;

    Ok(CursorData { created_at, id })
}

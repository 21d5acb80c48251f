//! Read-side access to the record store.
//!
//! Rows are fetched together with a `to_jsonb` rendering of themselves, so
//! columns that only exist in older deployments (legacy calorie keys,
//! renamed profile fields) travel with the typed columns and the core's
//! resolver can see them. Nothing here writes; the write paths live in the
//! route modules that own them.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use nosh_core::records::{Goal, NutritionRecord, UserProgressProfile, WorkoutFrequency};

use crate::error::AppError;

/// Raw food log row plus its full JSON rendering.
#[derive(sqlx::FromRow)]
pub struct FoodLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub log_date: Option<chrono::NaiveDate>,
    pub meal_type: String,
    pub food_items: Value,
    pub mood: Option<String>,
    pub water_intake: Option<i32>,
    pub doc: Value,
}

impl FoodLogRow {
    pub fn into_record(self) -> NutritionRecord {
        NutritionRecord {
            id: self.id,
            user_id: self.user_id,
            timestamp: self.created_at,
            log_date: self.log_date,
            meal_type: self.meal_type,
            food_items: food_items_list(&self.food_items),
            calorie_fields: self.doc.as_object().cloned().unwrap_or_default(),
            mood: self.mood,
            water_intake_glasses: self.water_intake,
        }
    }
}

/// `food_items` has been written as a JSON array of strings and, by older
/// clients, as a bare string. Read both.
fn food_items_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// All of a user's food logs with `created_at` inside `[from, to]`, oldest
/// first.
pub async fn fetch_logs_in_range(
    pool: &PgPool,
    user_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<NutritionRecord>, AppError> {
    let rows = sqlx::query_as::<_, FoodLogRow>(
        r#"
        SELECT id, user_id, created_at, log_date, meal_type, food_items, mood, water_intake,
               to_jsonb(food_logs) AS doc
        FROM food_logs
        WHERE user_id = $1
          AND created_at >= $2
          AND created_at <= $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FoodLogRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct DocRow {
    doc: Value,
}

/// The user's workout profile, merged from the `user_progress` and
/// `profiles` rows. Either or both rows may be absent; an unknown user gets
/// the zero-workout maintain profile.
pub async fn fetch_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<UserProgressProfile, AppError> {
    let progress = sqlx::query_as::<_, DocRow>(
        "SELECT to_jsonb(user_progress) AS doc FROM user_progress WHERE user_id = $1 LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let profile = sqlx::query_as::<_, DocRow>(
        "SELECT to_jsonb(profiles) AS doc FROM profiles WHERE user_id = $1 LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(merge_profile(
        user_id,
        progress.as_ref().and_then(|row| row.doc.as_object()),
        profile.as_ref().and_then(|row| row.doc.as_object()),
    ))
}

/// Merge the progress row (workout habits) with the profile row (BMI, and a
/// possibly-newer goal). Both rows have carried alternate key spellings over
/// time, so each field reads through its own candidate list.
pub fn merge_profile(
    user_id: Uuid,
    progress: Option<&Map<String, Value>>,
    profile: Option<&Map<String, Value>>,
) -> UserProgressProfile {
    let workout_frequency = progress
        .and_then(|doc| first_string(doc, &["workout_frequency", "frequency"]))
        .map(|raw| WorkoutFrequency::parse(&raw))
        .unwrap_or(WorkoutFrequency::Unknown);

    let calories_per_workout = progress
        .and_then(|doc| first_number(doc, &["calories_per_workout", "calories_per_session"]))
        .unwrap_or(0.0);

    let goal = profile
        .and_then(|doc| first_string(doc, &["goal"]))
        .or_else(|| progress.and_then(|doc| first_string(doc, &["goal"])))
        .map(|raw| Goal::parse(&raw))
        .unwrap_or(Goal::Maintain);

    let bmi = profile.and_then(|doc| first_number(doc, &["bmi"]));

    UserProgressProfile {
        user_id,
        workout_frequency,
        calories_per_workout,
        goal,
        bmi,
    }
}

fn first_string(doc: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        doc.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn first_number(doc: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match doc.get(*key) {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_reads_workout_fields_from_progress_row() {
        let progress = doc(json!({
            "workout_frequency": "daily",
            "calories_per_workout": 300,
            "goal": "lose"
        }));
        let merged = merge_profile(Uuid::nil(), Some(&progress), None);
        assert_eq!(merged.workout_frequency, WorkoutFrequency::Daily);
        assert_eq!(merged.calories_per_workout, 300.0);
        assert_eq!(merged.goal, Goal::Lose);
        assert_eq!(merged.bmi, None);
    }

    #[test]
    fn merge_tolerates_legacy_key_spellings() {
        let progress = doc(json!({
            "frequency": "3x",
            "calories_per_session": "250"
        }));
        let merged = merge_profile(Uuid::nil(), Some(&progress), None);
        assert_eq!(merged.workout_frequency, WorkoutFrequency::ThreePerWeek);
        assert_eq!(merged.calories_per_workout, 250.0);
    }

    #[test]
    fn profile_goal_wins_over_progress_goal() {
        let progress = doc(json!({ "goal": "lose" }));
        let profile = doc(json!({ "goal": "gain", "bmi": 27.4 }));
        let merged = merge_profile(Uuid::nil(), Some(&progress), Some(&profile));
        assert_eq!(merged.goal, Goal::Gain);
        assert_eq!(merged.bmi, Some(27.4));
    }

    #[test]
    fn null_profile_goal_falls_back_to_progress_goal() {
        let progress = doc(json!({ "goal": "lose" }));
        let profile = doc(json!({ "goal": null, "bmi": null }));
        let merged = merge_profile(Uuid::nil(), Some(&progress), Some(&profile));
        assert_eq!(merged.goal, Goal::Lose);
        assert_eq!(merged.bmi, None);
    }

    #[test]
    fn absent_rows_produce_the_unknown_profile() {
        let merged = merge_profile(Uuid::nil(), None, None);
        assert_eq!(merged.workout_frequency, WorkoutFrequency::Unknown);
        assert_eq!(merged.calories_per_workout, 0.0);
        assert_eq!(merged.goal, Goal::Maintain);
        assert_eq!(merged.bmi, None);
    }

    #[test]
    fn food_items_reads_array_and_bare_string() {
        assert_eq!(
            food_items_list(&json!(["rice", "dal"])),
            vec!["rice".to_string(), "dal".to_string()]
        );
        assert_eq!(food_items_list(&json!("khichuri")), vec!["khichuri".to_string()]);
        assert!(food_items_list(&json!(42)).is_empty());
    }
}

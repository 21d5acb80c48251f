//! Read-side views of persisted rows, and the resolver that recovers a
//! canonical calorie value from records written under different historical
//! schemas.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// Candidate calorie field names, highest priority first. Each of these has
/// been a live write path at some point; records are read as-is rather than
/// migrated, so every read goes through [`resolve_calories`].
pub const CALORIE_KEY_PRIORITY: [&str; 9] = [
    "approx_calories",
    "calories",
    "estimated_calories",
    "est_calories",
    "ai_estimated_calories",
    "ai_calories",
    "calorie_estimate",
    "calories_estimate",
    "kcal",
];

/// One persisted food log row, as the aggregation pipeline sees it.
/// Owned by the record store — this crate only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NutritionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Explicit log date, when the write path recorded one. Takes precedence
    /// over the timestamp-derived date when bucketing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_date: Option<NaiveDate>,
    pub meal_type: String,
    pub food_items: Vec<String>,
    /// Raw row fields under their stored names. Never read directly for
    /// calories — resolve through [`resolve_calories`].
    #[schema(value_type = Object)]
    pub calorie_fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_intake_glasses: Option<i32>,
}

impl NutritionRecord {
    /// The calendar date this record belongs to: the explicit `log_date` when
    /// present, else the date of its timestamp.
    pub fn effective_date(&self) -> NaiveDate {
        self.log_date.unwrap_or_else(|| self.timestamp.date_naive())
    }
}

/// How often the user works out, parsed leniently from the strings historical
/// write paths have stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutFrequency {
    Daily,
    #[serde(rename = "3_per_week")]
    ThreePerWeek,
    Never,
    Unknown,
}

impl WorkoutFrequency {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" | "everyday" => Self::Daily,
            "3_per_week" | "3x" => Self::ThreePerWeek,
            "never" => Self::Never,
            _ => Self::Unknown,
        }
    }

    /// Fixed weekly workout count used for the burn estimate.
    pub fn workouts_per_week(self) -> u32 {
        match self {
            Self::Daily => 7,
            Self::ThreePerWeek => 3,
            Self::Never | Self::Unknown => 0,
        }
    }

    /// Whether a workout burn lands on `date`. Three-per-week users are
    /// modeled as Monday/Wednesday/Friday (Sunday-indexed weekdays 1, 3, 5).
    pub fn burns_on(self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        match self {
            Self::Daily => true,
            Self::ThreePerWeek => {
                matches!(date.weekday().num_days_from_sunday(), 1 | 3 | 5)
            }
            Self::Never | Self::Unknown => false,
        }
    }
}

/// What the user is trying to do with their weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

impl Goal {
    /// Unknown strings fall back to Maintain, matching the write paths that
    /// never constrained this column.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lose" => Self::Lose,
            "gain" => Self::Gain,
            _ => Self::Maintain,
        }
    }
}

/// The user's workout profile, merged from the progress and profile rows.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProgressProfile {
    pub user_id: Uuid,
    pub workout_frequency: WorkoutFrequency,
    pub calories_per_workout: f64,
    pub goal: Goal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
}

impl UserProgressProfile {
    /// Profile for a user the store knows nothing about: no workouts, no BMI,
    /// maintain by default.
    pub fn unknown(user_id: Uuid) -> Self {
        Self {
            user_id,
            workout_frequency: WorkoutFrequency::Unknown,
            calories_per_workout: 0.0,
            goal: Goal::Maintain,
            bmi: None,
        }
    }
}

/// Cursor-based pagination envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    /// Cursor for the next page. None if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Whether there are more results after this page
    pub has_more: bool,
}

/// Resolve a single canonical calorie value from `record`.
///
/// Walks `candidate_keys` in priority order and returns the first value that
/// is present, non-null, non-empty, and coercible to a finite number; values
/// that fail coercion are skipped rather than aborting the walk. The result
/// is clamped non-negative. No candidate qualifies → `0.0`, never NaN — this
/// function is total, so aggregates built on it are always well-formed.
pub fn resolve_calories(record: &NutritionRecord, candidate_keys: &[&str]) -> f64 {
    resolve_calorie_fields(&record.calorie_fields, candidate_keys)
}

/// [`resolve_calories`] over a bare field map, for callers holding row JSON
/// rather than a full record.
pub fn resolve_calorie_fields(fields: &Map<String, Value>, candidate_keys: &[&str]) -> f64 {
    for key in candidate_keys {
        let Some(value) = fields.get(*key) else {
            continue;
        };
        if let Some(n) = coerce_finite(value) {
            return n.max(0.0);
        }
    }
    0.0
}

fn coerce_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record_with_fields(fields: Value) -> NutritionRecord {
        NutritionRecord {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap(),
            log_date: None,
            meal_type: "lunch".to_string(),
            food_items: vec!["rice".to_string()],
            calorie_fields: fields.as_object().cloned().unwrap_or_default(),
            mood: None,
            water_intake_glasses: None,
        }
    }

    #[test]
    fn kcal_string_resolves_to_number() {
        let record = record_with_fields(json!({ "kcal": "250" }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 250.0);
    }

    #[test]
    fn no_candidate_key_resolves_to_zero() {
        let record = record_with_fields(json!({ "protein_grams": 30 }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 0.0);
    }

    #[test]
    fn priority_order_prefers_approx_calories() {
        let record = record_with_fields(json!({ "kcal": 100, "approx_calories": 400 }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 400.0);
    }

    #[test]
    fn null_and_empty_candidates_are_skipped() {
        let record = record_with_fields(json!({
            "approx_calories": null,
            "calories": "",
            "estimated_calories": 320
        }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 320.0);
    }

    #[test]
    fn non_numeric_candidate_falls_through_to_next() {
        let record = record_with_fields(json!({
            "calories": "about 400",
            "kcal": 380
        }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 380.0);
    }

    #[test]
    fn negative_value_clamps_to_zero() {
        let record = record_with_fields(json!({ "calories": -120 }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 0.0);
    }

    #[test]
    fn whitespace_numeric_string_resolves() {
        let record = record_with_fields(json!({ "calories": " 410.5 " }));
        assert_eq!(resolve_calories(&record, &CALORIE_KEY_PRIORITY), 410.5);
    }

    #[test]
    fn effective_date_prefers_log_date() {
        let mut record = record_with_fields(json!({}));
        assert_eq!(
            record.effective_date(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        record.log_date = NaiveDate::from_ymd_opt(2024, 1, 14);
        assert_eq!(
            record.effective_date(),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
    }

    #[test]
    fn workout_frequency_parses_historical_spellings() {
        assert_eq!(WorkoutFrequency::parse("daily"), WorkoutFrequency::Daily);
        assert_eq!(WorkoutFrequency::parse("everyday"), WorkoutFrequency::Daily);
        assert_eq!(
            WorkoutFrequency::parse("3_per_week"),
            WorkoutFrequency::ThreePerWeek
        );
        assert_eq!(WorkoutFrequency::parse("3x"), WorkoutFrequency::ThreePerWeek);
        assert_eq!(WorkoutFrequency::parse("never"), WorkoutFrequency::Never);
        assert_eq!(
            WorkoutFrequency::parse("sometimes"),
            WorkoutFrequency::Unknown
        );
    }

    #[test]
    fn three_per_week_burns_monday_wednesday_friday() {
        // 2024-01-01 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let freq = WorkoutFrequency::ThreePerWeek;
        let burns: Vec<bool> = (0..7)
            .map(|i| freq.burns_on(monday + chrono::Duration::days(i)))
            .collect();
        // Mon Tue Wed Thu Fri Sat Sun
        assert_eq!(burns, [true, false, true, false, true, false, false]);
    }

    #[test]
    fn goal_parse_defaults_to_maintain() {
        assert_eq!(Goal::parse("lose"), Goal::Lose);
        assert_eq!(Goal::parse("GAIN"), Goal::Gain);
        assert_eq!(Goal::parse("whatever"), Goal::Maintain);
    }
}

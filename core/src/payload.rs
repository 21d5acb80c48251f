//! The closed set of payload shapes the model is prompted to produce, and
//! the validator that turns an extracted JSON value into one of them.
//!
//! Validation is shape-specific and strict: a payload either matches its
//! expected shape completely or fails with the offending field named. The
//! validator never fills in a plausible default — degrading to an empty
//! result on failure is a caller policy, not a core one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;

/// Which payload shape a call site expects. One kind per endpoint use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    MealPlan,
    TipList,
    CalorieEstimate,
    Recipe,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MealPlan => f.write_str("meal_plan"),
            Self::TipList => f.write_str("tip_list"),
            Self::CalorieEstimate => f.write_str("calorie_estimate"),
            Self::Recipe => f.write_str("recipe"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{kind} payload is missing required field `{field}`")]
    MissingField { kind: PayloadKind, field: String },
    #[error("{kind} payload field `{field}` has the wrong type")]
    WrongType { kind: PayloadKind, field: String },
    #[error("{kind} payload field `{field}` must not be empty")]
    EmptyRequired { kind: PayloadKind, field: String },
}

impl ValidationError {
    /// Machine-readable failure kind, surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::WrongType { .. } => "wrong_type",
            Self::EmptyRequired { .. } => "empty_required",
        }
    }

    /// The offending field, for structured error responses.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field, .. }
            | Self::WrongType { field, .. }
            | Self::EmptyRequired { field, .. } => field,
        }
    }
}

/// One meal slot of a generated daily plan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MealSection {
    pub items: Vec<String>,
    /// Display string, e.g. "420 kcal" — the model phrases this freely.
    pub calories: String,
}

/// A full generated daily food plan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MealPlan {
    pub breakfast: MealSection,
    pub lunch: MealSection,
    pub snacks: MealSection,
    pub dinner: MealSection,
    pub nutrition_summary: String,
}

/// Short motivational health tips.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TipList {
    pub tips: Vec<String>,
}

/// An AI calorie estimate for a single logged meal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalorieEstimate {
    pub approx_calories: f64,
    pub advice: String,
}

/// A generated recipe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: String,
    pub difficulty: String,
}

/// A validated model payload. Exactly one variant per [`PayloadKind`] —
/// partially-filled payloads do not exist.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Payload {
    MealPlan(MealPlan),
    TipList(TipList),
    CalorieEstimate(CalorieEstimate),
    Recipe(Recipe),
}

/// Check an extracted value against the expected payload shape.
pub fn validate(value: &Value, kind: PayloadKind) -> Result<Payload, ValidationError> {
    match kind {
        PayloadKind::MealPlan => validate_meal_plan(value).map(Payload::MealPlan),
        PayloadKind::TipList => validate_tip_list(value).map(Payload::TipList),
        PayloadKind::CalorieEstimate => {
            validate_calorie_estimate(value).map(Payload::CalorieEstimate)
        }
        PayloadKind::Recipe => validate_recipe(value).map(Payload::Recipe),
    }
}

fn validate_meal_plan(value: &Value) -> Result<MealPlan, ValidationError> {
    let kind = PayloadKind::MealPlan;
    let obj = as_object(value, kind, "payload")?;

    // All four meal keys are required.
    let breakfast = meal_section(obj, kind, "breakfast")?;
    let lunch = meal_section(obj, kind, "lunch")?;
    let snacks = meal_section(obj, kind, "snacks")?;
    let dinner = meal_section(obj, kind, "dinner")?;

    let nutrition_summary = required_str(obj, kind, "nutrition_summary")?.to_string();

    Ok(MealPlan {
        breakfast,
        lunch,
        snacks,
        dinner,
        nutrition_summary,
    })
}

fn meal_section(
    obj: &Map<String, Value>,
    kind: PayloadKind,
    meal: &str,
) -> Result<MealSection, ValidationError> {
    let section = obj.get(meal).ok_or_else(|| ValidationError::MissingField {
        kind,
        field: meal.to_string(),
    })?;
    let section = as_object(section, kind, meal)?;

    let items_field = format!("{meal}.items");
    let items = string_array(section, kind, "items", &items_field)?;
    if items.is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: items_field,
        });
    }

    let calories_field = format!("{meal}.calories");
    let calories = section
        .get("calories")
        .ok_or_else(|| ValidationError::MissingField {
            kind,
            field: calories_field.clone(),
        })?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            kind,
            field: calories_field,
        })?
        .to_string();

    Ok(MealSection { items, calories })
}

fn validate_tip_list(value: &Value) -> Result<TipList, ValidationError> {
    let kind = PayloadKind::TipList;
    let entries = value.as_array().ok_or_else(|| ValidationError::WrongType {
        kind,
        field: "tips".to_string(),
    })?;
    if entries.is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: "tips".to_string(),
        });
    }

    let mut tips = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let tip = entry.as_str().ok_or_else(|| ValidationError::WrongType {
            kind,
            field: format!("tips[{i}]"),
        })?;
        if tip.trim().is_empty() {
            return Err(ValidationError::EmptyRequired {
                kind,
                field: format!("tips[{i}]"),
            });
        }
        tips.push(tip.to_string());
    }

    Ok(TipList { tips })
}

fn validate_calorie_estimate(value: &Value) -> Result<CalorieEstimate, ValidationError> {
    let kind = PayloadKind::CalorieEstimate;
    let obj = as_object(value, kind, "payload")?;

    let raw = obj
        .get("approx_calories")
        .ok_or_else(|| ValidationError::MissingField {
            kind,
            field: "approx_calories".to_string(),
        })?;
    // Models occasionally quote the number; accept numeric strings the same
    // way the record-side resolver does.
    let approx_calories = coerce_number(raw).ok_or_else(|| ValidationError::WrongType {
        kind,
        field: "approx_calories".to_string(),
    })?;
    if !approx_calories.is_finite() || approx_calories <= 0.0 {
        return Err(ValidationError::WrongType {
            kind,
            field: "approx_calories".to_string(),
        });
    }

    let advice = required_str(obj, kind, "advice")?;
    if advice.trim().is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: "advice".to_string(),
        });
    }

    Ok(CalorieEstimate {
        approx_calories,
        advice: advice.to_string(),
    })
}

fn validate_recipe(value: &Value) -> Result<Recipe, ValidationError> {
    let kind = PayloadKind::Recipe;
    let obj = as_object(value, kind, "payload")?;

    let title = required_str(obj, kind, "title")?;
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: "title".to_string(),
        });
    }

    let ingredients = string_array(obj, kind, "ingredients", "ingredients")?;
    if ingredients.is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: "ingredients".to_string(),
        });
    }

    let instructions = string_array(obj, kind, "instructions", "instructions")?;
    if instructions.is_empty() {
        return Err(ValidationError::EmptyRequired {
            kind,
            field: "instructions".to_string(),
        });
    }

    Ok(Recipe {
        title: title.to_string(),
        ingredients,
        instructions,
        prep_time: required_str(obj, kind, "prep_time")?.to_string(),
        cook_time: required_str(obj, kind, "cook_time")?.to_string(),
        servings: required_str(obj, kind, "servings")?.to_string(),
        difficulty: required_str(obj, kind, "difficulty")?.to_string(),
    })
}

fn as_object<'v>(
    value: &'v Value,
    kind: PayloadKind,
    field: &str,
) -> Result<&'v Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::WrongType {
        kind,
        field: field.to_string(),
    })
}

fn required_str<'v>(
    obj: &'v Map<String, Value>,
    kind: PayloadKind,
    field: &str,
) -> Result<&'v str, ValidationError> {
    obj.get(field)
        .ok_or_else(|| ValidationError::MissingField {
            kind,
            field: field.to_string(),
        })?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            kind,
            field: field.to_string(),
        })
}

fn string_array(
    obj: &Map<String, Value>,
    kind: PayloadKind,
    key: &str,
    field: &str,
) -> Result<Vec<String>, ValidationError> {
    let entries = obj
        .get(key)
        .ok_or_else(|| ValidationError::MissingField {
            kind,
            field: field.to_string(),
        })?
        .as_array()
        .ok_or_else(|| ValidationError::WrongType {
            kind,
            field: field.to_string(),
        })?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidationError::WrongType {
                    kind,
                    field: field.to_string(),
                })
        })
        .collect()
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meal_plan_value() -> Value {
        json!({
            "breakfast": { "items": ["ruti", "egg"], "calories": "350 kcal" },
            "lunch": { "items": ["rice", "fish curry"], "calories": "600 kcal" },
            "snacks": { "items": ["fruit"], "calories": "150 kcal" },
            "dinner": { "items": ["khichuri"], "calories": "500 kcal" },
            "nutrition_summary": "Balanced day around 1600 kcal."
        })
    }

    #[test]
    fn meal_plan_with_all_sections_validates() {
        let payload = validate(&meal_plan_value(), PayloadKind::MealPlan).expect("valid plan");
        match payload {
            Payload::MealPlan(plan) => {
                assert_eq!(plan.lunch.items.len(), 2);
                assert_eq!(plan.dinner.calories, "500 kcal");
            }
            other => panic!("expected MealPlan, got {other:?}"),
        }
    }

    #[test]
    fn meal_plan_missing_section_names_the_field() {
        let mut value = meal_plan_value();
        value.as_object_mut().unwrap().remove("snacks");
        let err = validate(&value, PayloadKind::MealPlan).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                kind: PayloadKind::MealPlan,
                field: "snacks".to_string()
            }
        );
    }

    #[test]
    fn meal_plan_empty_items_is_empty_required() {
        let mut value = meal_plan_value();
        value["breakfast"]["items"] = json!([]);
        let err = validate(&value, PayloadKind::MealPlan).unwrap_err();
        assert_eq!(err.code(), "empty_required");
        assert_eq!(err.field(), "breakfast.items");
    }

    #[test]
    fn meal_plan_numeric_calories_is_wrong_type() {
        let mut value = meal_plan_value();
        value["lunch"]["calories"] = json!(600);
        let err = validate(&value, PayloadKind::MealPlan).unwrap_err();
        assert_eq!(err.field(), "lunch.calories");
        assert_eq!(err.code(), "wrong_type");
    }

    #[test]
    fn tip_list_validates_non_empty_strings() {
        let value = json!(["Drink water.", "Walk after meals."]);
        match validate(&value, PayloadKind::TipList).expect("valid tips") {
            Payload::TipList(list) => assert_eq!(list.tips.len(), 2),
            other => panic!("expected TipList, got {other:?}"),
        }
    }

    #[test]
    fn empty_tip_array_is_rejected() {
        let err = validate(&json!([]), PayloadKind::TipList).unwrap_err();
        assert_eq!(err.code(), "empty_required");
    }

    #[test]
    fn blank_tip_entry_names_its_index() {
        let err = validate(&json!(["good tip", "  "]), PayloadKind::TipList).unwrap_err();
        assert_eq!(err.field(), "tips[1]");
    }

    #[test]
    fn calorie_estimate_accepts_number() {
        let value = json!({ "approx_calories": 450, "advice": "Add protein." });
        match validate(&value, PayloadKind::CalorieEstimate).expect("valid estimate") {
            Payload::CalorieEstimate(est) => assert_eq!(est.approx_calories, 450.0),
            other => panic!("expected CalorieEstimate, got {other:?}"),
        }
    }

    #[test]
    fn calorie_estimate_accepts_numeric_string() {
        let value = json!({ "approx_calories": "450", "advice": "Add protein." });
        match validate(&value, PayloadKind::CalorieEstimate).expect("valid estimate") {
            Payload::CalorieEstimate(est) => assert_eq!(est.approx_calories, 450.0),
            other => panic!("expected CalorieEstimate, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_calorie_estimate_is_rejected() {
        let value = json!({ "approx_calories": 0, "advice": "n/a" });
        let err = validate(&value, PayloadKind::CalorieEstimate).unwrap_err();
        assert_eq!(err.field(), "approx_calories");
    }

    #[test]
    fn missing_advice_is_missing_field() {
        let value = json!({ "approx_calories": 450 });
        let err = validate(&value, PayloadKind::CalorieEstimate).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                kind: PayloadKind::CalorieEstimate,
                field: "advice".to_string()
            }
        );
    }

    #[test]
    fn recipe_requires_non_empty_instructions() {
        let value = json!({
            "title": "Masoor Dal",
            "ingredients": ["1 cup red lentils", "1 onion, sliced"],
            "instructions": [],
            "prep_time": "10 minutes",
            "cook_time": "25 minutes",
            "servings": "4 people",
            "difficulty": "Easy"
        });
        let err = validate(&value, PayloadKind::Recipe).unwrap_err();
        assert_eq!(err.field(), "instructions");
        assert_eq!(err.code(), "empty_required");
    }

    #[test]
    fn full_recipe_validates() {
        let value = json!({
            "title": "Masoor Dal",
            "ingredients": ["1 cup red lentils"],
            "instructions": ["Rinse lentils.", "Simmer 25 minutes."],
            "prep_time": "10 minutes",
            "cook_time": "25 minutes",
            "servings": "4 people",
            "difficulty": "Easy"
        });
        match validate(&value, PayloadKind::Recipe).expect("valid recipe") {
            Payload::Recipe(recipe) => assert_eq!(recipe.instructions.len(), 2),
            other => panic!("expected Recipe, got {other:?}"),
        }
    }

    #[test]
    fn non_object_payload_is_wrong_type() {
        let err = validate(&json!("just text"), PayloadKind::MealPlan).unwrap_err();
        assert_eq!(err.code(), "wrong_type");
    }

    #[test]
    fn non_string_ingredient_is_wrong_type() {
        let value = json!({
            "title": "Dal",
            "ingredients": ["lentils", 42],
            "instructions": ["cook"],
            "prep_time": "5 minutes",
            "cook_time": "20 minutes",
            "servings": "2 people",
            "difficulty": "Easy"
        });
        let err = validate(&value, PayloadKind::Recipe).unwrap_err();
        assert_eq!(err.field(), "ingredients");
    }
}

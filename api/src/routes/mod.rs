pub mod dashboard;
pub mod food_log;
pub mod health;
pub mod health_tips;
pub mod meal_plan;
pub mod progress;
pub mod recipes;

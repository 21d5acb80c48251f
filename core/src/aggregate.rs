//! Day-bucketed aggregation of nutrition records and the goal-progress
//! scorers built on top of it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::records::{
    resolve_calories, Goal, NutritionRecord, UserProgressProfile, CALORIE_KEY_PRIORITY,
};

/// Calories in roughly one pound of body fat; the denominator of every
/// goal-progress formula.
pub const CALORIES_PER_POUND: f64 = 3500.0;

/// An inclusive calendar-date range. Construction validates ordering, so a
/// held value is always well-formed and [`aggregate`] stays total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window end {end} is before start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days`-day window ending at `end` inclusive. `days` must be ≥ 1.
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - chrono::Duration::days(span),
            end,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive day count; always ≥ 1.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the window, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.num_days() as usize)
    }
}

/// One calendar day's consumed/burned totals.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub consumed_calories: f64,
    pub burned_calories: f64,
}

/// The dashboard read model: totals, score, and one bucket per window day.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_consumed: f64,
    pub total_burned: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    pub goal_progress_percent: f64,
    pub daily_buckets: Vec<DailyBucket>,
}

/// Aggregate `records` over `window` against the user's workout profile.
///
/// Total function: an empty record set or an absent profile yields all-zero
/// buckets, never a failure. Records are bucketed by their own date
/// (explicit `log_date` wins over the timestamp-derived date); records whose
/// date falls outside the window are ignored entirely, which keeps the bucket
/// sum identical to `total_consumed`.
///
/// The burn total uses a fixed weekly multiplier (7 workouts for daily users,
/// 3 for three-per-week) regardless of window length, mirroring the product's
/// dashboard math; per-day burn in the buckets follows the weekday pattern.
pub fn aggregate(
    records: &[NutritionRecord],
    profile: &UserProgressProfile,
    window: DateWindow,
) -> DashboardSummary {
    let mut consumed_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut total_consumed = 0.0;

    for record in records {
        let date = record.effective_date();
        if !window.contains(date) {
            continue;
        }
        let calories = resolve_calories(record, &CALORIE_KEY_PRIORITY);
        total_consumed += calories;
        *consumed_by_date.entry(date).or_insert(0.0) += calories;
    }

    let burned_per_workout = sanitize_burn(profile.calories_per_workout);
    let total_burned =
        burned_per_workout * f64::from(profile.workout_frequency.workouts_per_week());

    let daily_buckets = window
        .days()
        .map(|date| DailyBucket {
            date,
            consumed_calories: consumed_by_date.get(&date).copied().unwrap_or(0.0),
            burned_calories: if profile.workout_frequency.burns_on(date) {
                burned_per_workout
            } else {
                0.0
            },
        })
        .collect();

    let net_calories = total_consumed - total_burned;

    DashboardSummary {
        total_consumed,
        total_burned,
        bmi: profile.bmi,
        goal_progress_percent: goal_progress_percent(profile.goal, net_calories),
        daily_buckets,
    }
}

/// Goal progress on a 0–100 scale for `net_calories` over the window.
///
/// Losing is scored down from 100 as net intake grows; gaining is scored up
/// from 0; maintaining hovers around 50 with a gentler slope. Always clamped
/// to [0, 100].
pub fn goal_progress_percent(goal: Goal, net_calories: f64) -> f64 {
    let fraction = net_calories / CALORIES_PER_POUND;
    let raw = match goal {
        Goal::Lose => (100.0 - fraction * 100.0).round(),
        Goal::Gain => (fraction * 100.0).round(),
        Goal::Maintain => 50.0 - (fraction * 10.0).round(),
    };
    raw.clamp(0.0, 100.0)
}

/// The sign-based status used by the simpler progress view. Both scorers read
/// the same net-calories value; this one skips the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    OnTrack,
    Surplus,
    Deficit,
    Maintaining,
}

impl ProgressStatus {
    pub fn classify(goal: Goal, net_calories: f64) -> Self {
        match goal {
            Goal::Lose => {
                if net_calories < 0.0 {
                    Self::OnTrack
                } else {
                    Self::Surplus
                }
            }
            Goal::Gain => {
                if net_calories > 0.0 {
                    Self::OnTrack
                } else {
                    Self::Deficit
                }
            }
            Goal::Maintain => Self::Maintaining,
        }
    }
}

fn sanitize_burn(calories_per_workout: f64) -> f64 {
    if calories_per_workout.is_finite() {
        calories_per_workout.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::WorkoutFrequency;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_on(day: NaiveDate, calories: f64) -> NutritionRecord {
        NutritionRecord {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            timestamp: Utc
                .from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap()),
            log_date: Some(day),
            meal_type: "breakfast".to_string(),
            food_items: vec!["toast".to_string()],
            calorie_fields: json!({ "calories": calories })
                .as_object()
                .cloned()
                .unwrap(),
            mood: None,
            water_intake_glasses: None,
        }
    }

    fn profile(freq: WorkoutFrequency, per_workout: f64, goal: Goal) -> UserProgressProfile {
        UserProgressProfile {
            user_id: Uuid::nil(),
            workout_frequency: freq,
            calories_per_workout: per_workout,
            goal,
            bmi: Some(22.5),
        }
    }

    #[test]
    fn rejects_window_with_end_before_start() {
        let err = DateWindow::new(date(2024, 1, 10), date(2024, 1, 9)).unwrap_err();
        assert_eq!(
            err,
            WindowError::EndBeforeStart {
                start: date(2024, 1, 10),
                end: date(2024, 1, 9)
            }
        );
    }

    #[test]
    fn single_day_window_has_one_bucket() {
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        assert_eq!(window.num_days(), 1);
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::Never, 0.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.daily_buckets.len(), 1);
    }

    #[test]
    fn buckets_cover_window_and_sum_matches_total() {
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let records = vec![
            record_on(date(2024, 1, 1), 100.0),
            record_on(date(2024, 1, 3), 50.0),
        ];
        let summary = aggregate(
            &records,
            &profile(WorkoutFrequency::Never, 0.0, Goal::Maintain),
            window,
        );

        assert_eq!(summary.total_consumed, 150.0);
        assert_eq!(summary.daily_buckets.len(), 3);
        let per_day: Vec<f64> = summary
            .daily_buckets
            .iter()
            .map(|b| b.consumed_calories)
            .collect();
        assert_eq!(per_day, [100.0, 0.0, 50.0]);

        let bucket_sum: f64 = per_day.iter().sum();
        assert_eq!(bucket_sum, summary.total_consumed);
    }

    #[test]
    fn buckets_are_ascending_with_no_gaps() {
        let window = DateWindow::new(date(2024, 2, 27), date(2024, 3, 2)).unwrap();
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::Never, 0.0, Goal::Maintain),
            window,
        );
        let dates: Vec<NaiveDate> = summary.daily_buckets.iter().map(|b| b.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1),
                date(2024, 3, 2)
            ]
        );
    }

    #[test]
    fn records_outside_window_do_not_leak_into_totals() {
        let window = DateWindow::new(date(2024, 1, 2), date(2024, 1, 3)).unwrap();
        let records = vec![
            record_on(date(2024, 1, 1), 999.0),
            record_on(date(2024, 1, 2), 200.0),
        ];
        let summary = aggregate(
            &records,
            &profile(WorkoutFrequency::Never, 0.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.total_consumed, 200.0);
    }

    #[test]
    fn explicit_log_date_wins_over_timestamp_date() {
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 2)).unwrap();
        // Timestamp on the 2nd, but the row says it belongs to the 1st.
        let mut record = record_on(date(2024, 1, 2), 300.0);
        record.log_date = Some(date(2024, 1, 1));
        let summary = aggregate(
            &[record],
            &profile(WorkoutFrequency::Never, 0.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.daily_buckets[0].consumed_calories, 300.0);
        assert_eq!(summary.daily_buckets[1].consumed_calories, 0.0);
    }

    #[test]
    fn daily_workouts_burn_every_day_of_a_week_window() {
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::Daily, 300.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.total_burned, 2100.0);
        assert!(summary
            .daily_buckets
            .iter()
            .all(|b| b.burned_calories == 300.0));
    }

    #[test]
    fn three_per_week_burns_on_mon_wed_fri_only() {
        // 2024-01-01 is a Monday.
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::ThreePerWeek, 250.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.total_burned, 750.0);
        let burned: Vec<f64> = summary
            .daily_buckets
            .iter()
            .map(|b| b.burned_calories)
            .collect();
        assert_eq!(burned, [250.0, 0.0, 250.0, 0.0, 250.0, 0.0, 0.0]);
    }

    #[test]
    fn burn_multiplier_is_weekly_even_for_longer_windows() {
        // 14-day window still burns 7 × per-workout in the total; the
        // buckets, by contrast, mark every day.
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 14)).unwrap();
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::Daily, 100.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.total_burned, 700.0);
        assert_eq!(summary.daily_buckets.len(), 14);
    }

    #[test]
    fn unknown_frequency_burns_nothing() {
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let summary = aggregate(
            &[],
            &profile(WorkoutFrequency::Unknown, 500.0, Goal::Maintain),
            window,
        );
        assert_eq!(summary.total_burned, 0.0);
    }

    #[test]
    fn lose_goal_seven_hundred_net_scores_eighty() {
        assert_eq!(goal_progress_percent(Goal::Lose, 700.0), 80.0);
    }

    #[test]
    fn gain_goal_negative_net_clamps_to_zero() {
        assert_eq!(goal_progress_percent(Goal::Gain, -200.0), 0.0);
    }

    #[test]
    fn lose_goal_large_deficit_clamps_to_hundred() {
        assert_eq!(goal_progress_percent(Goal::Lose, -40_000.0), 100.0);
    }

    #[test]
    fn maintain_goal_at_zero_net_is_fifty() {
        assert_eq!(goal_progress_percent(Goal::Maintain, 0.0), 50.0);
    }

    #[test]
    fn progress_percent_is_always_in_range() {
        for goal in [Goal::Lose, Goal::Maintain, Goal::Gain] {
            for net in [-1_000_000.0, -3500.0, -1.0, 0.0, 1.0, 3500.0, 1_000_000.0] {
                let pct = goal_progress_percent(goal, net);
                assert!((0.0..=100.0).contains(&pct), "{goal:?} net={net} pct={pct}");
            }
        }
    }

    #[test]
    fn classify_matches_goal_and_sign() {
        assert_eq!(
            ProgressStatus::classify(Goal::Lose, -100.0),
            ProgressStatus::OnTrack
        );
        assert_eq!(
            ProgressStatus::classify(Goal::Lose, 100.0),
            ProgressStatus::Surplus
        );
        assert_eq!(
            ProgressStatus::classify(Goal::Gain, 100.0),
            ProgressStatus::OnTrack
        );
        assert_eq!(
            ProgressStatus::classify(Goal::Gain, -100.0),
            ProgressStatus::Deficit
        );
        assert_eq!(
            ProgressStatus::classify(Goal::Maintain, 9999.0),
            ProgressStatus::Maintaining
        );
    }
}

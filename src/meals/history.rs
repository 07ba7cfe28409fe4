//! Date-range bucketing for the meals history view

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::{DailySummary, MealWithFoods};

/// Days covered by the default history window, today included
pub const DEFAULT_HISTORY_DAYS: i64 = 7;

/// One calendar day of meals and its summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayMeals {
    pub date: NaiveDate,
    pub meals: Vec<MealWithFoods>,
    pub summary: Option<DailySummary>,
}

/// `[today - 6, today]`
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(DEFAULT_HISTORY_DAYS - 1), today)
}

/// One entry per day in `[start, end]`, oldest first
///
/// Meals keep their input order within a day. An inverted range is empty.
pub fn bucket_by_day(
    start: NaiveDate,
    end: NaiveDate,
    meals: &[MealWithFoods],
    summaries: &[DailySummary],
) -> Vec<DayMeals> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| DayMeals {
            date,
            meals: meals
                .iter()
                .filter(|m| m.meal.meal_date == date)
                .cloned()
                .collect(),
            summary: summaries.iter().find(|s| s.summary_date == date).cloned(),
        })
        .collect()
}

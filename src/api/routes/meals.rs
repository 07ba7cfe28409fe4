//! Meal Routes
//!
//! - GET /api/v1/meals?date= - Meals with their lines plus the day's summary
//! - GET /api/v1/meals/grouped?date= - Meal-type buckets with totals
//! - GET /api/v1/meals/history?start=&end= - One entry per day
//! - POST /api/v1/meal-foods - Log a food line
//! - PUT /api/v1/meal-foods/:id - Change a line's portion and add-ons
//! - DELETE /api/v1/meal-foods/:id - Remove a line

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::dto::{DateQuery, GroupedMealsResponse, HistoryResponse, MealsResponse, RangeQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::meals::{default_range, grouped_totals};
use crate::refresh::RefreshEvent;
use crate::storage::{MealFood, MealFoodInput, MealFoodUpdate};

/// Longest history window served in one request
pub const MAX_HISTORY_DAYS: i64 = 366;

const MEAL_EVENTS: &[RefreshEvent] = &[RefreshEvent::Today, RefreshEvent::Meals];

/// GET /api/v1/meals?date=
pub async fn meals_for_date(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<MealsResponse>> {
    let date = query.date.unwrap_or_else(|| state.today());
    let day = state.meals_cache.day(&state.store, user.id(), date).await?;

    Ok(Json(MealsResponse {
        date,
        meals: day.meals,
        summary: day.summary,
    }))
}

/// GET /api/v1/meals/grouped?date=
pub async fn grouped_meals(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<GroupedMealsResponse>> {
    let date = query.date.unwrap_or_else(|| state.today());
    let day = state.meals_cache.day(&state.store, user.id(), date).await?;

    Ok(Json(GroupedMealsResponse {
        date,
        groups: grouped_totals(&day.meals),
    }))
}

/// GET /api/v1/meals/history?start=&end=
///
/// Defaults to the seven days ending today.
pub async fn meal_history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let (default_start, default_end) = default_range(state.today());
    let start = query.start.unwrap_or(default_start);
    let end = query.end.unwrap_or(default_end);
    validate_range(start, end)?;

    let days = state
        .meals_cache
        .range(&state.store, user.id(), start, end)
        .await?;

    Ok(Json(HistoryResponse { start, end, days }))
}

/// POST /api/v1/meal-foods
///
/// Creates the meal when `meal_id` is absent. Nutrition is computed from
/// the portion and add-ons.
pub async fn add_meal_food(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<MealFoodInput>,
) -> ApiResult<(StatusCode, Json<MealFood>)> {
    let line = state.store.add_meal_food(user.id(), req).await?;

    tracing::info!(
        user_id = %user.id(),
        meal_id = %line.meal_id,
        food = %line.food_name,
        "Logged meal food"
    );
    state.notify(MEAL_EVENTS, user.id()).await;

    Ok((StatusCode::CREATED, Json(line)))
}

/// PUT /api/v1/meal-foods/:id
pub async fn update_meal_food(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<MealFoodUpdate>,
) -> ApiResult<Json<MealFood>> {
    let line = state.store.update_meal_food(user.id(), &id, req).await?;
    state.notify(MEAL_EVENTS, user.id()).await;
    Ok(Json(line))
}

/// DELETE /api/v1/meal-foods/:id
pub async fn delete_meal_food(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_meal_food(user.id(), &id).await?;

    tracing::info!(user_id = %user.id(), meal_food_id = %id, "Deleted meal food");
    state.notify(MEAL_EVENTS, user.id()).await;

    Ok(StatusCode::NO_CONTENT)
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::Validation(format!(
            "start {} is after end {}",
            start, end
        )));
    }
    if (end - start).num_days() >= MAX_HISTORY_DAYS {
        return Err(ApiError::Validation(format!(
            "history range is limited to {} days",
            MAX_HISTORY_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(date(2024, 3, 1), date(2024, 3, 1)).is_ok());
        assert!(validate_range(date(2024, 3, 2), date(2024, 3, 1)).is_err());
        assert!(validate_range(date(2024, 1, 1), date(2024, 12, 31)).is_ok());
        assert!(validate_range(date(2024, 1, 1), date(2025, 1, 1)).is_err());
    }
}

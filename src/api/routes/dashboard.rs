//! Dashboard Routes
//!
//! - GET /api/v1/today - Today's meals, grouped totals, summary and goal

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::dto::DashboardResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::meals::grouped_totals;

/// GET /api/v1/today
///
/// Meals and summary come through the meals cache; the goal is read
/// alongside.
pub async fn today(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<DashboardResponse>> {
    let date = state.today();

    let (day, goal) = tokio::join!(
        state.meals_cache.day(&state.store, user.id(), date),
        state.store.current_goal(user.id(), date)
    );
    let day = day?;

    Ok(Json(DashboardResponse {
        date,
        grouped: grouped_totals(&day.meals),
        meals: day.meals,
        summary: day.summary,
        goal: goal?,
    }))
}

//! Food Routes
//!
//! - GET /api/v1/foods/search?q= - Visible foods whose name contains `q`
//! - GET /api/v1/foods/recent - Recently logged foods
//! - GET /api/v1/foods/:id/options - Portions and add-ons of a food
//! - POST /api/v1/foods/custom - Submit a custom food with one portion

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::dto::{FoodSearchResponse, SearchQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::drawer::forms::MAX_CUSTOM_CALORIES;
use crate::storage::{CustomFood, CustomFoodInput, FoodOptions, Nutrition, RecentFood};

/// GET /api/v1/foods/search?q=
///
/// Queries shorter than two characters return no results.
pub async fn search_foods(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<FoodSearchResponse>> {
    let results = state.store.search_foods(user.id(), &query.q).await?;

    Ok(Json(FoodSearchResponse {
        query: query.q.trim().to_string(),
        total: results.len(),
        results,
    }))
}

/// GET /api/v1/foods/recent
pub async fn recent_foods(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<RecentFood>>> {
    Ok(Json(state.store.recent_foods(user.id()).await?))
}

/// GET /api/v1/foods/:id/options
pub async fn food_options(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<FoodOptions>> {
    Ok(Json(state.store.food_options(&id).await?))
}

/// POST /api/v1/foods/custom
///
/// The food is unapproved and visible only to its requester until an
/// admin approves it.
pub async fn create_custom_food(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(mut req): Json<CustomFoodInput>,
) -> ApiResult<(StatusCode, Json<CustomFood>)> {
    validate_custom_food(&mut req)?;
    let created = state.store.create_custom_food(user.id(), req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

fn validate_custom_food(req: &mut CustomFoodInput) -> ApiResult<()> {
    req.display_name = req.display_name.trim().to_string();
    if req.display_name.is_empty() {
        return Err(ApiError::Validation("display_name is required".to_string()));
    }

    let calories = req.nutrition.calories;
    if !(0.0..=MAX_CUSTOM_CALORIES as f64).contains(&calories) {
        return Err(ApiError::Validation(format!(
            "calories must be between 0 and {}",
            MAX_CUSTOM_CALORIES
        )));
    }
    validate_nutrition(&req.nutrition)
}

/// Every nutrition value must be a finite, non-negative number
pub(crate) fn validate_nutrition(n: &Nutrition) -> ApiResult<()> {
    let values = [
        ("calories", Some(n.calories)),
        ("protein_g", Some(n.protein_g)),
        ("carbs_g", Some(n.carbs_g)),
        ("fats_g", Some(n.fats_g)),
        ("fiber_g", n.fiber_g),
    ];

    for (field, value) in values {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(ApiError::Validation(format!(
                    "{} must be a non-negative number",
                    field
                )));
            }
        }
    }
    Ok(())
}

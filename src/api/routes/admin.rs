//! Admin Routes
//!
//! Food catalog curation; every handler requires the admin role.
//!
//! - GET /api/v1/admin/foods?search=&category=&status= - List foods
//! - POST /api/v1/admin/foods - Create a food
//! - GET /api/v1/admin/foods/:id - Get a food
//! - PUT /api/v1/admin/foods/:id - Update a food
//! - DELETE /api/v1/admin/foods/:id - Delete a food with its portions and add-ons
//! - POST /api/v1/admin/foods/:id/approve - Approve a food
//! - GET /api/v1/admin/foods/:id/portions - List portions
//! - POST /api/v1/admin/foods/:id/portions - Create a portion
//! - PUT /api/v1/admin/portions/:id - Update a portion
//! - DELETE /api/v1/admin/portions/:id - Delete a portion
//! - GET /api/v1/admin/foods/:id/addons - List add-ons
//! - POST /api/v1/admin/foods/:id/addons - Create an add-on
//! - PUT /api/v1/admin/addons/:id - Update an add-on
//! - DELETE /api/v1/admin/addons/:id - Delete an add-on

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::auth::AdminUser;
use crate::api::dto::FoodListResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::foods::validate_nutrition;
use crate::api::state::AppState;
use crate::storage::{
    AddonInput, Food, FoodAddon, FoodFilter, FoodInput, FoodPortion, PortionInput,
};

// ============================================
// FOODS
// ============================================

/// GET /api/v1/admin/foods
pub async fn list_foods(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(filter): Query<FoodFilter>,
) -> ApiResult<Json<FoodListResponse>> {
    let foods = state.store.list_foods(&filter).await?;
    Ok(Json(FoodListResponse {
        total: foods.len(),
        foods,
    }))
}

/// POST /api/v1/admin/foods
pub async fn create_food(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(req): Json<FoodInput>,
) -> ApiResult<(StatusCode, Json<Food>)> {
    validate_food(&req)?;
    let food = state.store.create_food(admin.id(), req).await?;

    tracing::info!(admin_id = %admin.id(), food_id = %food.id, "Created food");
    Ok((StatusCode::CREATED, Json(food)))
}

/// GET /api/v1/admin/foods/:id
pub async fn get_food(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Food>> {
    Ok(Json(state.store.get_food(&id).await?))
}

/// PUT /api/v1/admin/foods/:id
pub async fn update_food(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<FoodInput>,
) -> ApiResult<Json<Food>> {
    validate_food(&req)?;
    Ok(Json(state.store.update_food(admin.id(), &id, req).await?))
}

/// DELETE /api/v1/admin/foods/:id
pub async fn delete_food(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_food(&id).await?;
    // logged lines lose their food reference
    state.meals_cache.invalidate_all().await;
    tracing::info!(admin_id = %admin.id(), food_id = %id, "Deleted food");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/foods/:id/approve
pub async fn approve_food(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Food>> {
    Ok(Json(state.store.approve_food(admin.id(), &id).await?))
}

// ============================================
// PORTIONS
// ============================================

/// GET /api/v1/admin/foods/:id/portions
pub async fn list_portions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(food_id): Path<String>,
) -> ApiResult<Json<Vec<FoodPortion>>> {
    Ok(Json(state.store.list_portions(&food_id).await?))
}

/// POST /api/v1/admin/foods/:id/portions
pub async fn create_portion(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(food_id): Path<String>,
    Json(req): Json<PortionInput>,
) -> ApiResult<(StatusCode, Json<FoodPortion>)> {
    validate_name(&req.display_name)?;
    validate_nutrition(&req.nutrition)?;
    let portion = state.store.create_portion(&food_id, req).await?;
    Ok((StatusCode::CREATED, Json(portion)))
}

/// PUT /api/v1/admin/portions/:id
pub async fn update_portion(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<PortionInput>,
) -> ApiResult<Json<FoodPortion>> {
    validate_name(&req.display_name)?;
    validate_nutrition(&req.nutrition)?;
    Ok(Json(state.store.update_portion(&id, req).await?))
}

/// DELETE /api/v1/admin/portions/:id
pub async fn delete_portion(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_portion(&id).await?;
    state.meals_cache.invalidate_all().await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================
// ADD-ONS
// ============================================

/// GET /api/v1/admin/foods/:id/addons
pub async fn list_addons(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(food_id): Path<String>,
) -> ApiResult<Json<Vec<FoodAddon>>> {
    Ok(Json(state.store.list_addons(&food_id).await?))
}

/// POST /api/v1/admin/foods/:id/addons
pub async fn create_addon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(food_id): Path<String>,
    Json(req): Json<AddonInput>,
) -> ApiResult<(StatusCode, Json<FoodAddon>)> {
    validate_name(&req.display_name)?;
    validate_nutrition(&req.nutrition)?;
    let addon = state.store.create_addon(&food_id, req).await?;
    Ok((StatusCode::CREATED, Json(addon)))
}

/// PUT /api/v1/admin/addons/:id
pub async fn update_addon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<AddonInput>,
) -> ApiResult<Json<FoodAddon>> {
    validate_name(&req.display_name)?;
    validate_nutrition(&req.nutrition)?;
    Ok(Json(state.store.update_addon(&id, req).await?))
}

/// DELETE /api/v1/admin/addons/:id
pub async fn delete_addon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_addon(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("display_name is required".to_string()));
    }
    Ok(())
}

fn validate_food(req: &FoodInput) -> ApiResult<()> {
    validate_name(&req.display_name)?;
    if req.category.trim().is_empty() {
        return Err(ApiError::Validation("category is required".to_string()));
    }
    Ok(())
}

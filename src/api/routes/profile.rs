//! Profile Routes
//!
//! - GET /api/v1/profile - The caller's profile
//! - POST /api/v1/profile - Register the caller
//! - PATCH /api/v1/profile - Update selected fields

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::dto::RegisterRequest;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::drawer::forms::{ACTIVITY_LEVELS, MAX_WEIGHT_KG};
use crate::refresh::RefreshEvent;
use crate::storage::{NewProfile, Profile, ProfileUpdate, Role};

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Profile>> {
    state
        .store
        .get_profile(user.id())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Profile not found: {}", user.id())))
}

/// POST /api/v1/profile
///
/// Users listed in `admin_user_ids` are registered as admins, everyone
/// else as a client.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::Validation("full_name is required".to_string()));
    }

    let role = if state.config.is_admin(user.id()) {
        Role::Admin
    } else {
        Role::Client
    };
    let profile = state
        .store
        .create_profile(user.id(), NewProfile { full_name, role })
        .await?;

    tracing::info!(user_id = %user.id(), role = %role.as_str(), "Registered profile");
    state.notify(&[RefreshEvent::Profile], user.id()).await;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// PATCH /api/v1/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    validate_profile_update(&req)?;
    let profile = state.store.update_profile(user.id(), req).await?;
    state.notify(&[RefreshEvent::Profile], user.id()).await;
    Ok(Json(profile))
}

fn validate_profile_update(req: &ProfileUpdate) -> ApiResult<()> {
    if req.is_empty() {
        return Err(ApiError::Validation("no fields to update".to_string()));
    }
    if let Some(name) = &req.full_name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("full_name cannot be empty".to_string()));
        }
    }
    if let Some(age) = req.age {
        if !(1..=999).contains(&age) {
            return Err(ApiError::Validation("age must be between 1 and 999".to_string()));
        }
    }
    if let Some(height) = req.height_cm {
        if !(1..=999).contains(&height) {
            return Err(ApiError::Validation(
                "height_cm must be between 1 and 999".to_string(),
            ));
        }
    }
    if let Some(weight) = req.weight_kg {
        if !weight.is_finite() || weight <= 0.0 || weight > MAX_WEIGHT_KG {
            return Err(ApiError::Validation(format!(
                "weight_kg must be greater than 0 and at most {}",
                MAX_WEIGHT_KG
            )));
        }
    }
    if let Some(level) = &req.activity_level {
        if !ACTIVITY_LEVELS.contains(&level.as_str()) {
            return Err(ApiError::Validation(format!(
                "activity_level must be one of: {}",
                ACTIVITY_LEVELS.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_profile_update() {
        assert!(validate_profile_update(&ProfileUpdate::default()).is_err());

        let ok = ProfileUpdate {
            age: Some(34),
            activity_level: Some("active".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&ok).is_ok());

        let bad = ProfileUpdate {
            activity_level: Some("lazy".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&bad).is_err());

        let bad = ProfileUpdate {
            height_cm: Some(1000),
            ..Default::default()
        };
        assert!(validate_profile_update(&bad).is_err());
    }
}

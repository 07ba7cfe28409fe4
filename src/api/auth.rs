//! Caller identity
//!
//! Requests identify their user with the `x-user-id` header. Admin routes
//! additionally require the caller's profile to carry the admin role.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::storage::Profile;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;

        let user_id = value
            .to_str()
            .map(str::trim)
            .map_err(|_| ApiError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))?;
        if user_id.is_empty() {
            return Err(ApiError::Unauthorized(format!("empty {} header", USER_ID_HEADER)));
        }

        Ok(CurrentUser(user_id.to_string()))
    }
}

/// A caller whose profile has the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub Profile);

impl AdminUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user_id) = CurrentUser::from_request_parts(parts, state).await?;

        match state.store.get_profile(&user_id).await? {
            Some(profile) if profile.is_admin() => Ok(AdminUser(profile)),
            _ => {
                tracing::warn!(user_id = %user_id, "Admin route denied");
                Err(ApiError::Forbidden("admin role required".to_string()))
            }
        }
    }
}

//! Weight Routes
//!
//! - GET /api/v1/weight?limit= - Recent logs, newest first
//! - POST /api/v1/weight - Record a weight; replaces that day's entry
//! - PUT /api/v1/weight/:id - Edit a log
//! - DELETE /api/v1/weight/:id - Delete a log

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::dto::{LimitQuery, WeightListResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::drawer::forms::MAX_WEIGHT_KG;
use crate::refresh::RefreshEvent;
use crate::storage::{WeightInput, WeightLog};

pub const DEFAULT_WEIGHT_LIMIT: usize = 10;
pub const MAX_WEIGHT_LIMIT: usize = 365;

/// GET /api/v1/weight?limit=
pub async fn list_weight(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<WeightListResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_WEIGHT_LIMIT)
        .clamp(1, MAX_WEIGHT_LIMIT);
    let logs = state.store.recent_weight_logs(user.id(), limit).await?;

    Ok(Json(WeightListResponse {
        total: logs.len(),
        logs,
    }))
}

/// POST /api/v1/weight
pub async fn log_weight(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<WeightInput>,
) -> ApiResult<Json<WeightLog>> {
    validate_weight(&req)?;
    let log = state.store.upsert_weight(user.id(), req).await?;

    tracing::info!(user_id = %user.id(), log_date = %log.log_date, "Logged weight");
    state.notify(&[RefreshEvent::Weight], user.id()).await;

    Ok(Json(log))
}

/// PUT /api/v1/weight/:id
pub async fn update_weight(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<WeightInput>,
) -> ApiResult<Json<WeightLog>> {
    validate_weight(&req)?;
    let log = state.store.update_weight(user.id(), &id, req).await?;
    state.notify(&[RefreshEvent::Weight], user.id()).await;
    Ok(Json(log))
}

/// DELETE /api/v1/weight/:id
pub async fn delete_weight(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_weight(user.id(), &id).await?;
    state.notify(&[RefreshEvent::Weight], user.id()).await;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_weight(req: &WeightInput) -> ApiResult<()> {
    if !req.weight_kg.is_finite() || req.weight_kg <= 0.0 || req.weight_kg > MAX_WEIGHT_KG {
        return Err(ApiError::Validation(format!(
            "weight_kg must be greater than 0 and at most {}",
            MAX_WEIGHT_KG
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(weight_kg: f64) -> WeightInput {
        WeightInput {
            weight_kg,
            log_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight(&input(72.5)).is_ok());
        assert!(validate_weight(&input(500.0)).is_ok());
        assert!(validate_weight(&input(0.0)).is_err());
        assert!(validate_weight(&input(500.5)).is_err());
        assert!(validate_weight(&input(f64::NAN)).is_err());
    }
}

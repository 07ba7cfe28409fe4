//! Goal Routes
//!
//! - GET /api/v1/goals/current - Goal in effect today
//! - POST /api/v1/goals - Start a new goal today
//! - PUT /api/v1/goals/:id - Overwrite a goal's targets

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::auth::CurrentUser;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::refresh::RefreshEvent;
use crate::storage::{GoalInput, UserGoal};

/// Goal changes also rewrite today's summary targets
const GOAL_EVENTS: &[RefreshEvent] = &[RefreshEvent::Goals, RefreshEvent::Today];

/// GET /api/v1/goals/current
pub async fn current_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Option<UserGoal>>> {
    let goal = state.store.current_goal(user.id(), state.today()).await?;
    Ok(Json(goal))
}

/// POST /api/v1/goals
///
/// Previously active goals end yesterday.
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<GoalInput>,
) -> ApiResult<(StatusCode, Json<UserGoal>)> {
    validate_goal(&req)?;
    let goal = state.store.create_goal(user.id(), req, state.today()).await?;

    tracing::info!(
        user_id = %user.id(),
        goal_id = %goal.id,
        daily_calorie = goal.daily_calorie,
        "Started goal"
    );
    state.notify(GOAL_EVENTS, user.id()).await;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// PUT /api/v1/goals/:id
pub async fn update_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<GoalInput>,
) -> ApiResult<Json<UserGoal>> {
    validate_goal(&req)?;
    let goal = state
        .store
        .update_goal(user.id(), &id, req, state.today())
        .await?;
    state.notify(GOAL_EVENTS, user.id()).await;
    Ok(Json(goal))
}

fn validate_goal(req: &GoalInput) -> ApiResult<()> {
    if req.daily_calorie <= 0 {
        return Err(ApiError::Validation(
            "daily_calorie must be positive".to_string(),
        ));
    }

    let macros = [
        ("daily_protein_g", req.daily_protein_g),
        ("daily_carbs_g", req.daily_carbs_g),
        ("daily_fats_g", req.daily_fats_g),
        ("daily_fiber_g", req.daily_fiber_g),
    ];
    for (field, value) in macros {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::Validation(format!(
                "{} must be a non-negative number",
                field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_goal() {
        let goal = GoalInput {
            daily_calorie: 2000,
            daily_protein_g: 150.0,
            daily_carbs_g: 200.0,
            daily_fats_g: 60.0,
            daily_fiber_g: 0.0,
            reason: None,
        };
        assert!(validate_goal(&goal).is_ok());

        let zero = GoalInput {
            daily_calorie: 0,
            ..goal.clone()
        };
        assert!(validate_goal(&zero).is_err());

        let negative = GoalInput {
            daily_fats_g: -1.0,
            ..goal
        };
        assert!(validate_goal(&negative).is_err());
    }
}

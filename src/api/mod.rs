//! Renshuu REST API
//!
//! HTTP API layer, built with Axum. Every `/api/v1` route identifies its
//! caller with the `x-user-id` header.
//!
//! # Endpoints
//!
//! ## Dashboard
//! - `GET /api/v1/today` - Today's meals, grouped totals, summary and goal
//!
//! ## Meals
//! - `GET /api/v1/meals?date=` - Meals with lines plus the day's summary
//! - `GET /api/v1/meals/grouped?date=` - Meal-type buckets with totals
//! - `GET /api/v1/meals/history?start=&end=` - One entry per day
//! - `POST /api/v1/meal-foods` - Log a food line
//! - `PUT /api/v1/meal-foods/:id` - Change portion and add-ons
//! - `DELETE /api/v1/meal-foods/:id` - Remove a line
//!
//! ## Foods
//! - `GET /api/v1/foods/search?q=` - Search visible foods
//! - `GET /api/v1/foods/recent` - Recently logged foods
//! - `GET /api/v1/foods/:id/options` - Portions and add-ons
//! - `POST /api/v1/foods/custom` - Submit a custom food
//!
//! ## Tracking
//! - `GET/POST /api/v1/weight`, `PUT/DELETE /api/v1/weight/:id`
//! - `GET /api/v1/goals/current`, `POST /api/v1/goals`, `PUT /api/v1/goals/:id`
//! - `GET/POST/PATCH /api/v1/profile`
//!
//! ## Admin
//! - `/api/v1/admin/foods`, `/api/v1/admin/portions`, `/api/v1/admin/addons`
//!
//! ## Health
//! - `GET /api/health` - Database round-trip check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws?user_id=` - Refresh notifications

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{AdminUser, CurrentUser, USER_ID_HEADER};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::refresh::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/today", get(routes::dashboard::today))
        // Meals
        .route("/meals", get(routes::meals::meals_for_date))
        .route("/meals/grouped", get(routes::meals::grouped_meals))
        .route("/meals/history", get(routes::meals::meal_history))
        .route("/meal-foods", post(routes::meals::add_meal_food))
        .route(
            "/meal-foods/:id",
            put(routes::meals::update_meal_food).delete(routes::meals::delete_meal_food),
        )
        // Foods
        .route("/foods/search", get(routes::foods::search_foods))
        .route("/foods/recent", get(routes::foods::recent_foods))
        .route("/foods/custom", post(routes::foods::create_custom_food))
        .route("/foods/:id/options", get(routes::foods::food_options))
        // Weight
        .route(
            "/weight",
            get(routes::weight::list_weight).post(routes::weight::log_weight),
        )
        .route(
            "/weight/:id",
            put(routes::weight::update_weight).delete(routes::weight::delete_weight),
        )
        // Goals
        .route("/goals/current", get(routes::goals::current_goal))
        .route("/goals", post(routes::goals::create_goal))
        .route("/goals/:id", put(routes::goals::update_goal))
        // Profile
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .post(routes::profile::create_profile)
                .patch(routes::profile::update_profile),
        )
        .nest("/admin", admin_routes());

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/api/health", get(routes::health::api_health))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn admin_routes() -> Router<Arc<AppState>> {
    use routes::admin;

    Router::new()
        .route("/foods", get(admin::list_foods).post(admin::create_food))
        .route(
            "/foods/:id",
            get(admin::get_food)
                .put(admin::update_food)
                .delete(admin::delete_food),
        )
        .route("/foods/:id/approve", post(admin::approve_food))
        .route(
            "/foods/:id/portions",
            get(admin::list_portions).post(admin::create_portion),
        )
        .route(
            "/portions/:id",
            put(admin::update_portion).delete(admin::delete_portion),
        )
        .route(
            "/foods/:id/addons",
            get(admin::list_addons).post(admin::create_addon),
        )
        .route(
            "/addons/:id",
            put(admin::update_addon).delete(admin::delete_addon),
        )
}

/// Any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Renshuu API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Renshuu API shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::{RefreshEvent, ServerMessage};
    use crate::storage::testing::{seed_food, SeededFood};
    use crate::storage::StorageEngine;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    impl TestApp {
        async fn new() -> Self {
            let store = Arc::new(StorageEngine::in_memory().await.unwrap());
            let config = ApiConfig {
                admin_user_ids: vec!["admin".to_string()],
                ..Default::default()
            };
            let state = AppState::new(store, config);
            let router = build_router(state.clone());
            Self { router, state }
        }

        /// App with registered profiles for `users`
        async fn with_users(users: &[&str]) -> Self {
            let app = Self::new().await;
            for user in users {
                let response = app
                    .send(user, "POST", "/api/v1/profile", Some(json!({"full_name": user})))
                    .await;
                assert_eq!(response.status(), StatusCode::CREATED);
            }
            app
        }

        async fn send(
            &self,
            user: &str,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> Response {
            let mut request = Request::builder().method(method).uri(uri);
            if !user.is_empty() {
                request = request.header(USER_ID_HEADER, user);
            }
            let body = match body {
                Some(value) => {
                    request = request.header("Content-Type", "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };

            self.router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap()
        }

        async fn food(&self, name: &str, approved: bool) -> SeededFood {
            seed_food(&self.state.store, name, approved).await
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn log_line(food: &SeededFood, date: &str) -> Value {
        json!({
            "meal_type": "breakfast",
            "meal_date": date,
            "food_id": food.food.id,
            "portion_id": food.portions[0].id,
            "selected_addons": [food.addons[0].id],
        })
    }

    #[tokio::test]
    async fn test_health_probes() {
        let app = TestApp::new().await;

        for uri in ["/health/live", "/health/ready", "/health"] {
            let response = app.send("", "GET", uri, None).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_api_health() {
        let app = TestApp::new().await;

        let response = app.send("", "GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], "Database connection is healthy");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_missing_user_header() {
        let app = TestApp::new().await;

        let response = app.send("", "GET", "/api/v1/today", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_register_assigns_role() {
        let app = TestApp::with_users(&["admin", "u1"]).await;

        let body = body_json(app.send("admin", "GET", "/api/v1/profile", None).await).await;
        assert_eq!(body["role"], "admin");

        let body = body_json(app.send("u1", "GET", "/api/v1/profile", None).await).await;
        assert_eq!(body["role"], "client");

        let again = app
            .send("u1", "POST", "/api/v1/profile", Some(json!({"full_name": "Again"})))
            .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_log_meal_food_updates_views() {
        let app = TestApp::with_users(&["u1"]).await;
        let oats = app.food("Oatmeal", true).await;

        // prime the cache with an empty day
        let body = body_json(app.send("u1", "GET", "/api/v1/meals?date=2024-03-04", None).await).await;
        assert_eq!(body["meals"].as_array().unwrap().len(), 0);

        let response = app
            .send("u1", "POST", "/api/v1/meal-foods", Some(log_line(&oats, "2024-03-04")))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let line = body_json(response).await;
        assert_eq!(line["calories"], 364.0);
        assert_eq!(line["addons_display"], json!(["Honey"]));

        let body = body_json(app.send("u1", "GET", "/api/v1/meals?date=2024-03-04", None).await).await;
        assert_eq!(body["meals"].as_array().unwrap().len(), 1);
        assert_eq!(body["summary"]["total_calories"], 364.0);

        let body = body_json(
            app.send("u1", "GET", "/api/v1/meals/grouped?date=2024-03-04", None)
                .await,
        )
        .await;
        assert_eq!(body["groups"][0]["meal_type"], "breakfast");
        assert_eq!(body["groups"][0]["total_calories"], 364.0);
    }

    #[tokio::test]
    async fn test_meal_food_edit_and_delete() {
        let app = TestApp::with_users(&["u1", "u2"]).await;
        let oats = app.food("Oatmeal", true).await;

        let line = body_json(
            app.send("u1", "POST", "/api/v1/meal-foods", Some(log_line(&oats, "2024-03-04")))
                .await,
        )
        .await;
        let uri = format!("/api/v1/meal-foods/{}", line["id"].as_str().unwrap());

        let update = json!({"portion_id": oats.portions[1].id, "selected_addons": []});
        let response = app.send("u2", "PUT", &uri, Some(update.clone())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.send("u1", "PUT", &uri, Some(update)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["calories"], 150.0);

        let response = app.send("u1", "DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let body = body_json(app.send("u1", "GET", "/api/v1/meals?date=2024-03-04", None).await).await;
        assert_eq!(body["summary"]["total_calories"], 0.0);
    }

    #[tokio::test]
    async fn test_foreign_addon_rejected() {
        let app = TestApp::with_users(&["u1"]).await;
        let oats = app.food("Oatmeal", true).await;
        let rice = app.food("Rice", true).await;

        let mut line = log_line(&oats, "2024-03-04");
        line["selected_addons"] = json!([rice.addons[0].id]);

        let response = app.send("u1", "POST", "/api/v1/meal-foods", Some(line)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_meal_change_reaches_websocket_subscribers() {
        let app = TestApp::with_users(&["u1"]).await;
        let oats = app.food("Oatmeal", true).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = app.state.ws_hub.register("u1", tx).await.unwrap();
        app.state
            .ws_hub
            .subscribe(&connection, vec!["refresh.meals".to_string()])
            .await
            .unwrap();

        app.send("u1", "POST", "/api/v1/meal-foods", Some(log_line(&oats, "2024-03-04")))
            .await;

        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Refresh {
                event: RefreshEvent::Meals
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_food_search_visibility() {
        let app = TestApp::with_users(&["u1", "u2"]).await;
        app.food("Oatmeal", true).await;

        let response = app
            .send(
                "u1",
                "POST",
                "/api/v1/foods/custom",
                Some(json!({"display_name": "Oat cookie", "calories": 120.0, "protein_g": 2.0, "carbs_g": 18.0, "fats_g": 5.0})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["portion"]["display_name"], "1 serving");

        let mine = body_json(app.send("u1", "GET", "/api/v1/foods/search?q=oat", None).await).await;
        assert_eq!(mine["total"], 2);

        let theirs = body_json(app.send("u2", "GET", "/api/v1/foods/search?q=oat", None).await).await;
        assert_eq!(theirs["total"], 1);

        let short = body_json(app.send("u1", "GET", "/api/v1/foods/search?q=o", None).await).await;
        assert_eq!(short["total"], 0);
    }

    #[tokio::test]
    async fn test_weight_upsert_keeps_one_per_day() {
        let app = TestApp::with_users(&["u1"]).await;

        for weight in [80.0, 79.4] {
            let response = app
                .send(
                    "u1",
                    "POST",
                    "/api/v1/weight",
                    Some(json!({"weight_kg": weight, "log_date": "2024-03-04"})),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let body = body_json(app.send("u1", "GET", "/api/v1/weight", None).await).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["logs"][0]["weight_kg"], 79.4);

        let response = app
            .send(
                "u1",
                "POST",
                "/api/v1/weight",
                Some(json!({"weight_kg": 0, "log_date": "2024-03-05"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_goals_and_dashboard() {
        let app = TestApp::with_users(&["u1"]).await;

        let body = body_json(app.send("u1", "GET", "/api/v1/goals/current", None).await).await;
        assert!(body.is_null());

        let response = app
            .send(
                "u1",
                "POST",
                "/api/v1/goals",
                Some(json!({
                    "daily_calorie": 2200,
                    "daily_protein_g": 160.0,
                    "daily_carbs_g": 220.0,
                    "daily_fats_g": 70.0
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(app.send("u1", "GET", "/api/v1/today", None).await).await;
        assert_eq!(body["goal"]["daily_calorie"], 2200);
        assert_eq!(body["goal"]["set_by"], "self");
        assert_eq!(body["grouped"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_goal_change_reaches_cached_day() {
        let app = TestApp::with_users(&["u1"]).await;
        let oats = app.food("Oatmeal", true).await;
        let today = app.state.today().to_string();
        let meals_uri = format!("/api/v1/meals?date={}", today);

        app.send("u1", "POST", "/api/v1/meal-foods", Some(log_line(&oats, &today)))
            .await;
        let body = body_json(app.send("u1", "GET", &meals_uri, None).await).await;
        assert!(body["summary"]["target_calories"].is_null());

        let goal = |calories: i64| {
            json!({
                "daily_calorie": calories,
                "daily_protein_g": 160.0,
                "daily_carbs_g": 220.0,
                "daily_fats_g": 70.0
            })
        };
        let response = app.send("u1", "POST", "/api/v1/goals", Some(goal(2200))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let goal_id = body_json(response).await["id"].as_str().unwrap().to_string();

        let body = body_json(app.send("u1", "GET", &meals_uri, None).await).await;
        assert_eq!(body["summary"]["target_calories"], 2200);

        let body = body_json(app.send("u1", "GET", "/api/v1/today", None).await).await;
        assert_eq!(body["summary"]["target_calories"], 2200);
        assert_eq!(body["goal"]["daily_calorie"], 2200);

        let response = app
            .send("u1", "PUT", &format!("/api/v1/goals/{}", goal_id), Some(goal(1900)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(app.send("u1", "GET", &meals_uri, None).await).await;
        assert_eq!(body["summary"]["target_calories"], 1900);
    }

    #[tokio::test]
    async fn test_repeated_addon_is_bad_request() {
        let app = TestApp::with_users(&["u1"]).await;
        let oats = app.food("Oatmeal", true).await;

        let mut line = log_line(&oats, "2024-03-04");
        line["selected_addons"] = json!([oats.addons[0].id, oats.addons[0].id]);

        let response = app.send("u1", "POST", "/api/v1/meal-foods", Some(line)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_deletes_reach_cached_days() {
        let app = TestApp::with_users(&["admin", "u1"]).await;
        let oats = app.food("Oatmeal", true).await;
        let meals_uri = "/api/v1/meals?date=2024-03-04";

        app.send("u1", "POST", "/api/v1/meal-foods", Some(log_line(&oats, "2024-03-04")))
            .await;
        let body = body_json(app.send("u1", "GET", meals_uri, None).await).await;
        let line = &body["meals"][0]["meal_foods"][0];
        assert_eq!(line["food_id"], json!(oats.food.id));
        assert_eq!(line["portion_id"], json!(oats.portions[0].id));

        let response = app
            .send(
                "admin",
                "PUT",
                &format!("/api/v1/admin/portions/{}", oats.portions[1].id),
                Some(json!({"display_name": "Small bowl", "calories": 140.0, "protein_g": 5.0, "carbs_g": 25.0, "fats_g": 2.0})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["display_name"], "Small bowl");

        let response = app
            .send(
                "admin",
                "DELETE",
                &format!("/api/v1/admin/portions/{}", oats.portions[0].id),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let body = body_json(app.send("u1", "GET", meals_uri, None).await).await;
        let line = &body["meals"][0]["meal_foods"][0];
        assert!(line["portion_id"].is_null());
        assert_eq!(line["food_id"], json!(oats.food.id));

        let response = app
            .send(
                "admin",
                "DELETE",
                &format!("/api/v1/admin/foods/{}", oats.food.id),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let body = body_json(app.send("u1", "GET", meals_uri, None).await).await;
        let line = &body["meals"][0]["meal_foods"][0];
        assert!(line["food_id"].is_null());
        assert_eq!(line["food_name"], "Oatmeal");
        assert_eq!(body["summary"]["total_calories"], 364.0);
    }

    #[tokio::test]
    async fn test_history_default_window() {
        let app = TestApp::with_users(&["u1"]).await;

        let body = body_json(app.send("u1", "GET", "/api/v1/meals/history", None).await).await;
        assert_eq!(body["days"].as_array().unwrap().len(), 7);

        let response = app
            .send(
                "u1",
                "GET",
                "/api/v1/meals/history?start=2024-03-05&end=2024-03-01",
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let app = TestApp::with_users(&["admin", "u1"]).await;
        let new_food = json!({"display_name": "Lentils", "category": "legumes"});

        let response = app
            .send("u1", "POST", "/api/v1/admin/foods", Some(new_food.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .send("admin", "POST", "/api/v1/admin/foods", Some(new_food))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let food = body_json(response).await;
        let food_id = food["id"].as_str().unwrap();

        let response = app
            .send(
                "admin",
                "POST",
                &format!("/api/v1/admin/foods/{}/portions", food_id),
                Some(json!({"display_name": "1 cup", "calories": 230.0, "protein_g": 18.0, "carbs_g": 40.0, "fats_g": 0.8})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let pending = body_json(
            app.send("admin", "GET", "/api/v1/admin/foods?status=pending", None)
                .await,
        )
        .await;
        assert_eq!(pending["total"], 1);

        let response = app
            .send(
                "admin",
                "POST",
                &format!("/api/v1/admin/foods/{}/approve", food_id),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["is_approved"], true);

        let results = body_json(app.send("u1", "GET", "/api/v1/foods/search?q=lent", None).await).await;
        assert_eq!(results["total"], 1);
    }
}

//! Shared fixtures for storage-backed tests

use crate::storage::engine::StorageEngine;
use crate::storage::types::{
    AddonInput, Food, FoodAddon, FoodInput, FoodPortion, NewProfile, Nutrition, PortionInput, Role,
};

pub struct SeededFood {
    pub food: Food,
    /// Inserted as [300 kcal, 150 kcal]
    pub portions: Vec<FoodPortion>,
    /// Inserted as [Honey, Almonds]
    pub addons: Vec<FoodAddon>,
}

pub fn profile(name: &str) -> NewProfile {
    NewProfile {
        full_name: name.to_string(),
        role: Role::Client,
    }
}

/// In-memory engine with one registered profile
pub async fn engine_with_user(user_id: &str) -> StorageEngine {
    let engine = StorageEngine::in_memory().await.unwrap();
    engine.create_profile(user_id, profile(user_id)).await.unwrap();
    engine
}

/// A food with two portions and two add-ons
pub async fn seed_food(engine: &StorageEngine, name: &str, approved: bool) -> SeededFood {
    let food = engine
        .create_food(
            "",
            FoodInput {
                display_name: name.to_string(),
                category: "breakfast".to_string(),
                subcategory: None,
                description: None,
                is_approved: Some(false),
            },
        )
        .await
        .unwrap();

    if approved {
        engine
            .connection()
            .unwrap()
            .execute("UPDATE foods SET is_approved = 1 WHERE id = ?1", [&food.id])
            .unwrap();
    }
    let food = engine.get_food(&food.id).await.unwrap();

    let mut portions = Vec::new();
    for (label, nutrition) in [
        ("1 cup", Nutrition::new(300.0, 10.0, 54.0, 5.0).fiber(8.0)),
        ("Half cup", Nutrition::new(150.0, 5.0, 27.0, 2.5).fiber(4.0)),
    ] {
        portions.push(
            engine
                .create_portion(
                    &food.id,
                    PortionInput {
                        display_name: label.to_string(),
                        description: None,
                        nutrition,
                    },
                )
                .await
                .unwrap(),
        );
    }

    let mut addons = Vec::new();
    for (label, nutrition) in [
        ("Honey", Nutrition::new(64.0, 0.0, 17.0, 0.0)),
        ("Almonds", Nutrition::new(100.0, 4.0, 3.0, 9.0).fiber(2.0)),
    ] {
        addons.push(
            engine
                .create_addon(
                    &food.id,
                    AddonInput {
                        display_name: label.to_string(),
                        category: None,
                        nutrition,
                    },
                )
                .await
                .unwrap(),
        );
    }

    SeededFood {
        food,
        portions,
        addons,
    }
}

//! Meal grouping
//!
//! Buckets a day's meals by meal type in display order and sums each
//! bucket's precomputed meal totals. Meals without lines are skipped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::{MealType, MealWithFoods};

/// Meals bucketed by type; `BTreeMap` iteration follows `MealType` order
pub type GroupedMeals = BTreeMap<MealType, Vec<MealWithFoods>>;

/// One meal-type bucket with its summed totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealTypeTotals {
    pub meal_type: MealType,
    pub meals: Vec<MealWithFoods>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
}

/// Bucket meals by type, dropping meals with no lines; input order is kept
pub fn group_meals_by_type(meals: &[MealWithFoods]) -> GroupedMeals {
    let mut grouped = GroupedMeals::new();
    for meal in meals.iter().filter(|m| !m.meal_foods.is_empty()) {
        grouped
            .entry(meal.meal.meal_type)
            .or_default()
            .push(meal.clone());
    }
    grouped
}

/// Sum a bucket's meal totals; absent totals count as zero
pub fn meal_type_totals(meal_type: MealType, meals: Vec<MealWithFoods>) -> MealTypeTotals {
    let sum = |f: fn(&MealWithFoods) -> Option<f64>| -> f64 {
        meals.iter().map(|m| f(m).unwrap_or(0.0)).sum()
    };

    MealTypeTotals {
        meal_type,
        total_calories: sum(|m| m.meal.total_calories),
        total_protein: sum(|m| m.meal.total_protein_g),
        total_carbs: sum(|m| m.meal.total_carbs_g),
        total_fats: sum(|m| m.meal.total_fats_g),
        meals,
    }
}

/// Non-empty buckets in breakfast, lunch, dinner, snack order
pub fn sort_meals_by_type(grouped: GroupedMeals) -> Vec<MealTypeTotals> {
    grouped
        .into_iter()
        .filter(|(_, meals)| !meals.is_empty())
        .map(|(meal_type, meals)| meal_type_totals(meal_type, meals))
        .collect()
}

/// `group_meals_by_type` followed by `sort_meals_by_type`
pub fn grouped_totals(meals: &[MealWithFoods]) -> Vec<MealTypeTotals> {
    sort_meals_by_type(group_meals_by_type(meals))
}

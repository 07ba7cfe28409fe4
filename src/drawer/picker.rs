//! Portion and add-on selection for the food form

use chrono::NaiveDate;

use super::controller::DrawerError;
use crate::storage::{
    FoodAddon, FoodOptions, FoodPortion, MealFoodInput, MealFoodUpdate, MealType, Nutrition,
};

/// Selection state of the food form
#[derive(Debug, Clone)]
pub struct PortionPicker {
    portions: Vec<FoodPortion>,
    addons: Vec<FoodAddon>,
    selected_portion: Option<String>,
    selected_addons: Vec<String>,
}

impl PortionPicker {
    /// Fresh selection: the lowest-calorie portion, no add-ons
    pub fn new(options: FoodOptions) -> Self {
        let mut picker = Self::sorted(options);
        picker.selected_portion = picker.portions.first().map(|p| p.id.clone());
        picker
    }

    /// Edit mode: start from an existing line's portion and add-ons
    pub fn for_edit(
        options: FoodOptions,
        portion_id: Option<&str>,
        selected_addons: &[String],
    ) -> Self {
        let mut picker = Self::sorted(options);
        picker.selected_portion = portion_id
            .filter(|id| picker.portions.iter().any(|p| p.id == *id))
            .map(str::to_string);
        picker.selected_addons = selected_addons
            .iter()
            .filter(|id| picker.addons.iter().any(|a| &a.id == *id))
            .cloned()
            .collect();
        picker
    }

    fn sorted(options: FoodOptions) -> Self {
        let FoodOptions {
            mut portions,
            mut addons,
        } = options;
        portions.sort_by(|a, b| a.nutrition.calories.total_cmp(&b.nutrition.calories));
        addons.sort_by_key(|a| a.display_name.to_lowercase());

        Self {
            portions,
            addons,
            selected_portion: None,
            selected_addons: Vec::new(),
        }
    }

    pub fn portions(&self) -> &[FoodPortion] {
        &self.portions
    }

    pub fn addons(&self) -> &[FoodAddon] {
        &self.addons
    }

    pub fn selected_portion(&self) -> Option<&FoodPortion> {
        let id = self.selected_portion.as_deref()?;
        self.portions.iter().find(|p| p.id == id)
    }

    /// Selected add-on ids in the order they were picked
    pub fn selected_addons(&self) -> &[String] {
        &self.selected_addons
    }

    pub fn is_addon_selected(&self, addon_id: &str) -> bool {
        self.selected_addons.iter().any(|id| id == addon_id)
    }

    pub fn select_portion(&mut self, portion_id: &str) -> Result<(), DrawerError> {
        if !self.portions.iter().any(|p| p.id == portion_id) {
            return Err(DrawerError::UnknownOption(portion_id.to_string()));
        }
        self.selected_portion = Some(portion_id.to_string());
        Ok(())
    }

    /// Select or deselect an add-on; returns whether it is now selected
    pub fn toggle_addon(&mut self, addon_id: &str) -> Result<bool, DrawerError> {
        if !self.addons.iter().any(|a| a.id == addon_id) {
            return Err(DrawerError::UnknownOption(addon_id.to_string()));
        }

        if self.is_addon_selected(addon_id) {
            self.selected_addons.retain(|id| id != addon_id);
            Ok(false)
        } else {
            self.selected_addons.push(addon_id.to_string());
            Ok(true)
        }
    }

    /// Portion plus selected add-ons; zero without a portion
    pub fn totals(&self) -> Nutrition {
        let Some(portion) = self.selected_portion() else {
            return Nutrition::default();
        };

        self.selected_addons
            .iter()
            .filter_map(|id| self.addons.iter().find(|a| &a.id == id))
            .fold(portion.nutrition, |total, addon| total.add(&addon.nutrition))
    }

    /// Request body for a new line
    pub fn to_input(
        &self,
        meal_id: Option<String>,
        meal_type: MealType,
        meal_date: NaiveDate,
        food_id: &str,
    ) -> Result<MealFoodInput, DrawerError> {
        let portion = self.selected_portion().ok_or(DrawerError::NoPortionSelected)?;
        Ok(MealFoodInput {
            meal_id,
            meal_type,
            meal_date,
            food_id: food_id.to_string(),
            portion_id: portion.id.clone(),
            selected_addons: self.selected_addons.clone(),
        })
    }

    /// Request body for editing a line
    pub fn to_update(&self) -> Result<MealFoodUpdate, DrawerError> {
        let portion = self.selected_portion().ok_or(DrawerError::NoPortionSelected)?;
        Ok(MealFoodUpdate {
            portion_id: portion.id.clone(),
            selected_addons: self.selected_addons.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn portion(id: &str, calories: f64) -> FoodPortion {
        let now = Utc::now();
        FoodPortion {
            id: id.to_string(),
            food_id: "f".to_string(),
            display_name: id.to_string(),
            description: None,
            nutrition: Nutrition::new(calories, 10.0, 20.0, 5.0),
            created_at: now,
            updated_at: now,
        }
    }

    fn addon(id: &str, name: &str, calories: f64) -> FoodAddon {
        let now = Utc::now();
        FoodAddon {
            id: id.to_string(),
            food_id: "f".to_string(),
            display_name: name.to_string(),
            category: None,
            nutrition: Nutrition::new(calories, 1.0, 2.0, 3.0).fiber(1.0),
            created_at: now,
            updated_at: now,
        }
    }

    fn options() -> FoodOptions {
        FoodOptions {
            portions: vec![portion("large", 500.0), portion("small", 200.0)],
            addons: vec![addon("h", "honey", 60.0), addon("a", "Almonds", 100.0)],
        }
    }

    #[test]
    fn test_default_selection() {
        let picker = PortionPicker::new(options());

        assert_eq!(picker.selected_portion().map(|p| p.id.as_str()), Some("small"));
        assert!(picker.selected_addons().is_empty());

        let names: Vec<&str> = picker.addons().iter().map(|a| a.display_name.as_str()).collect();
        assert_eq!(names, vec!["Almonds", "honey"]);
    }

    #[test]
    fn test_toggle_preserves_selection_order() {
        let mut picker = PortionPicker::new(options());

        assert_eq!(picker.toggle_addon("h"), Ok(true));
        assert_eq!(picker.toggle_addon("a"), Ok(true));
        assert_eq!(picker.selected_addons(), ["h", "a"]);

        assert_eq!(picker.toggle_addon("h"), Ok(false));
        assert_eq!(picker.selected_addons(), ["a"]);

        assert!(picker.toggle_addon("zzz").is_err());
    }

    #[test]
    fn test_totals() {
        let mut picker = PortionPicker::new(options());
        picker.select_portion("large").unwrap();
        picker.toggle_addon("a").unwrap();
        picker.toggle_addon("h").unwrap();

        let totals = picker.totals();
        assert_eq!(totals.calories, 660.0);
        assert_eq!(totals.protein_g, 12.0);
        assert_eq!(totals.fiber_g, Some(2.0));
    }

    #[test]
    fn test_no_portion_totals_zero() {
        let picker = PortionPicker::new(FoodOptions {
            portions: vec![],
            addons: vec![addon("a", "Almonds", 100.0)],
        });
        assert_eq!(picker.totals(), Nutrition::default());
        assert_eq!(picker.to_update(), Err(DrawerError::NoPortionSelected));
    }

    #[test]
    fn test_edit_mode_starts_from_line() {
        let picker = PortionPicker::for_edit(
            options(),
            Some("large"),
            &["a".to_string(), "gone".to_string()],
        );

        assert_eq!(picker.selected_portion().map(|p| p.id.as_str()), Some("large"));
        assert_eq!(picker.selected_addons(), ["a"]);

        let update = picker.to_update().unwrap();
        assert_eq!(update.portion_id, "large");
        assert_eq!(update.selected_addons, vec!["a".to_string()]);
    }

    #[test]
    fn test_to_input() {
        let picker = PortionPicker::new(options());
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let input = picker.to_input(None, MealType::Snack, date, "f").unwrap();
        assert_eq!(input.portion_id, "small");
        assert_eq!(input.meal_type, MealType::Snack);
        assert!(input.selected_addons.is_empty());
    }
}

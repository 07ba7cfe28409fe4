//! Drawer step-chain
//!
//! One drawer is open at a time. Logging a meal walks
//! `action-menu → meal-type → food-search → food-form`, with an optional
//! detour through `custom-food-form`. Each step carries the previous
//! payload forward. Saving closes the drawer and yields the refresh events
//! the caller must emit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::picker::PortionPicker;
use crate::refresh::RefreshEvent;
use crate::storage::{MealFood, MealFoodInput, MealType, UserGoal, WeightLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawerKind {
    ActionMenu,
    MealType,
    FoodSearch,
    FoodForm,
    CustomFoodForm,
    WeightForm,
    ProfileForm,
    GoalsForm,
}

impl DrawerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawerKind::ActionMenu => "action-menu",
            DrawerKind::MealType => "meal-type",
            DrawerKind::FoodSearch => "food-search",
            DrawerKind::FoodForm => "food-form",
            DrawerKind::CustomFoodForm => "custom-food-form",
            DrawerKind::WeightForm => "weight-form",
            DrawerKind::ProfileForm => "profile-form",
            DrawerKind::GoalsForm => "goals-form",
        }
    }
}

impl fmt::Display for DrawerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn open_name(kind: &Option<DrawerKind>) -> &'static str {
    kind.map(|k| k.as_str()).unwrap_or("no drawer")
}

#[derive(Debug, Error, PartialEq)]
pub enum DrawerError {
    #[error("expected the {expected} drawer, found {}", open_name(.actual))]
    UnexpectedStep {
        expected: DrawerKind,
        actual: Option<DrawerKind>,
    },

    #[error("{} has nothing to save", open_name(.actual))]
    NothingToSave { actual: Option<DrawerKind> },

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("no portion selected")]
    NoPortionSelected,

    #[error("drawer payload is missing {0}")]
    MissingField(&'static str),
}

/// Data handed from one drawer to the next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    /// Existing meal to add to; a new meal is created when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,

    #[serde(default)]
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_food_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portion_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_addons: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_log_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_goal: Option<UserGoal>,
}

/// Entries of the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    LogMeal,
    LogWeight,
}

#[derive(Debug, Clone, Default)]
pub struct DrawerController {
    open: Option<(DrawerKind, DrawerPayload)>,
}

impl DrawerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is open
    pub fn open(&mut self, kind: DrawerKind, payload: DrawerPayload) {
        tracing::debug!(drawer = %kind, "Opening drawer");
        self.open = Some((kind, payload));
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn kind(&self) -> Option<DrawerKind> {
        self.open.as_ref().map(|(kind, _)| *kind)
    }

    pub fn payload(&self) -> Option<&DrawerPayload> {
        self.open.as_ref().map(|(_, payload)| payload)
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Payload of the open drawer if it is `expected`
    fn expect(&self, expected: DrawerKind) -> Result<&DrawerPayload, DrawerError> {
        match &self.open {
            Some((kind, payload)) if *kind == expected => Ok(payload),
            _ => Err(DrawerError::UnexpectedStep {
                expected,
                actual: self.kind(),
            }),
        }
    }

    /// action-menu → meal-type or weight-form
    pub fn select_action(
        &mut self,
        action: QuickAction,
        page_date: Option<NaiveDate>,
    ) -> Result<(), DrawerError> {
        self.expect(DrawerKind::ActionMenu)?;

        match action {
            QuickAction::LogMeal => self.open(
                DrawerKind::MealType,
                DrawerPayload {
                    target_date: page_date,
                    ..Default::default()
                },
            ),
            QuickAction::LogWeight => self.open(DrawerKind::WeightForm, DrawerPayload::default()),
        }
        Ok(())
    }

    /// meal-type → food-search; the target date falls back to `today`
    pub fn select_meal_type(
        &mut self,
        meal_type: MealType,
        today: NaiveDate,
    ) -> Result<(), DrawerError> {
        let previous = self.expect(DrawerKind::MealType)?;
        let payload = DrawerPayload {
            meal_type: Some(meal_type),
            target_date: Some(previous.target_date.unwrap_or(today)),
            ..Default::default()
        };
        self.open(DrawerKind::FoodSearch, payload);
        Ok(())
    }

    /// food-search → food-form
    pub fn select_food(&mut self, food_id: &str, food_name: &str) -> Result<(), DrawerError> {
        let payload = DrawerPayload {
            food_id: Some(food_id.to_string()),
            food_name: Some(food_name.to_string()),
            ..self.expect(DrawerKind::FoodSearch)?.clone()
        };
        self.open(DrawerKind::FoodForm, payload);
        Ok(())
    }

    /// food-search → custom-food-form, prefilled with the search text
    pub fn create_custom_food(&mut self, suggested_name: &str) -> Result<(), DrawerError> {
        let payload = DrawerPayload {
            suggested_name: Some(suggested_name.to_string()),
            ..self.expect(DrawerKind::FoodSearch)?.clone()
        };
        self.open(DrawerKind::CustomFoodForm, payload);
        Ok(())
    }

    /// custom-food-form → food-form with the newly created food
    pub fn custom_food_created(&mut self, food_id: &str, food_name: &str) -> Result<(), DrawerError> {
        let payload = DrawerPayload {
            food_id: Some(food_id.to_string()),
            food_name: Some(food_name.to_string()),
            suggested_name: None,
            ..self.expect(DrawerKind::CustomFoodForm)?.clone()
        };
        self.open(DrawerKind::FoodForm, payload);
        Ok(())
    }

    /// Open the food form on an existing line
    pub fn edit_meal_food(&mut self, line: &MealFood) {
        self.open(
            DrawerKind::FoodForm,
            DrawerPayload {
                is_edit: true,
                meal_food_id: Some(line.id.clone()),
                meal_id: Some(line.meal_id.clone()),
                food_id: line.food_id.clone(),
                food_name: Some(line.food_name.clone()),
                portion_id: line.portion_id.clone(),
                selected_addons: line.selected_addons.clone().unwrap_or_default(),
                ..Default::default()
            },
        );
    }

    /// Open the weight form on an existing log
    pub fn edit_weight(&mut self, log: &WeightLog) {
        self.open(
            DrawerKind::WeightForm,
            DrawerPayload {
                is_edit: true,
                weight_log_id: Some(log.id.clone()),
                weight_kg: Some(log.weight_kg),
                log_date: Some(log.log_date),
                notes: log.notes.clone(),
                ..Default::default()
            },
        );
    }

    pub fn open_goals(&mut self, current_goal: Option<UserGoal>) {
        self.open(
            DrawerKind::GoalsForm,
            DrawerPayload {
                current_goal,
                ..Default::default()
            },
        );
    }

    pub fn open_profile(&mut self) {
        self.open(DrawerKind::ProfileForm, DrawerPayload::default());
    }

    /// New-line request built from the open food form and `picker`
    pub fn meal_food_input(&self, picker: &PortionPicker) -> Result<MealFoodInput, DrawerError> {
        let payload = self.expect(DrawerKind::FoodForm)?;
        let meal_type = payload.meal_type.ok_or(DrawerError::MissingField("meal_type"))?;
        let meal_date = payload
            .target_date
            .ok_or(DrawerError::MissingField("target_date"))?;
        let food_id = payload
            .food_id
            .as_deref()
            .ok_or(DrawerError::MissingField("food_id"))?;

        picker.to_input(payload.meal_id.clone(), meal_type, meal_date, food_id)
    }

    /// Close a saved form and return the refresh events to emit
    pub fn finish_save(&mut self) -> Result<Vec<RefreshEvent>, DrawerError> {
        let events = match self.kind() {
            Some(DrawerKind::FoodForm) => vec![RefreshEvent::Today, RefreshEvent::Meals],
            Some(DrawerKind::WeightForm) => vec![RefreshEvent::Weight],
            Some(DrawerKind::GoalsForm) => vec![RefreshEvent::Goals],
            Some(DrawerKind::ProfileForm) => vec![RefreshEvent::Profile],
            actual => return Err(DrawerError::NothingToSave { actual }),
        };

        self.close();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FoodOptions, FoodPortion, Nutrition};
    use chrono::Utc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at_action_menu() -> DrawerController {
        let mut drawer = DrawerController::new();
        drawer.open(DrawerKind::ActionMenu, DrawerPayload::default());
        drawer
    }

    #[test]
    fn test_meal_logging_chain() {
        let mut drawer = at_action_menu();

        drawer.select_action(QuickAction::LogMeal, Some(date(2))).unwrap();
        assert_eq!(drawer.kind(), Some(DrawerKind::MealType));

        drawer.select_meal_type(MealType::Dinner, date(9)).unwrap();
        assert_eq!(drawer.kind(), Some(DrawerKind::FoodSearch));

        drawer.select_food("f1", "Oatmeal").unwrap();
        let payload = drawer.payload().unwrap();
        assert_eq!(drawer.kind(), Some(DrawerKind::FoodForm));
        assert_eq!(payload.meal_type, Some(MealType::Dinner));
        assert_eq!(payload.target_date, Some(date(2)));
        assert_eq!(payload.food_name.as_deref(), Some("Oatmeal"));
        assert!(!payload.is_edit);

        let events = drawer.finish_save().unwrap();
        assert_eq!(events, vec![RefreshEvent::Today, RefreshEvent::Meals]);
        assert!(!drawer.is_open());
    }

    #[test]
    fn test_target_date_defaults_to_today() {
        let mut drawer = at_action_menu();
        drawer.select_action(QuickAction::LogMeal, None).unwrap();
        drawer.select_meal_type(MealType::Breakfast, date(9)).unwrap();

        assert_eq!(drawer.payload().unwrap().target_date, Some(date(9)));
    }

    #[test]
    fn test_custom_food_detour() {
        let mut drawer = at_action_menu();
        drawer.select_action(QuickAction::LogMeal, None).unwrap();
        drawer.select_meal_type(MealType::Snack, date(5)).unwrap();

        drawer.create_custom_food("Grandma's muffin").unwrap();
        assert_eq!(drawer.kind(), Some(DrawerKind::CustomFoodForm));
        assert_eq!(
            drawer.payload().unwrap().suggested_name.as_deref(),
            Some("Grandma's muffin")
        );
        assert_eq!(drawer.finish_save(), Err(DrawerError::NothingToSave {
            actual: Some(DrawerKind::CustomFoodForm)
        }));

        drawer.custom_food_created("new-id", "Muffin").unwrap();
        let payload = drawer.payload().unwrap();
        assert_eq!(drawer.kind(), Some(DrawerKind::FoodForm));
        assert_eq!(payload.food_id.as_deref(), Some("new-id"));
        assert_eq!(payload.meal_type, Some(MealType::Snack));
        assert_eq!(payload.target_date, Some(date(5)));
        assert_eq!(payload.suggested_name, None);
    }

    #[test]
    fn test_wrong_step_leaves_state() {
        let mut drawer = at_action_menu();
        drawer.select_action(QuickAction::LogMeal, Some(date(3))).unwrap();
        let before = drawer.payload().cloned();

        let err = drawer.select_food("f1", "Oatmeal").unwrap_err();
        assert_eq!(
            err,
            DrawerError::UnexpectedStep {
                expected: DrawerKind::FoodSearch,
                actual: Some(DrawerKind::MealType),
            }
        );
        assert_eq!(err.to_string(), "expected the food-search drawer, found meal-type");
        assert_eq!(drawer.kind(), Some(DrawerKind::MealType));
        assert_eq!(drawer.payload().cloned(), before);

        let mut closed = DrawerController::new();
        assert!(matches!(
            closed.select_meal_type(MealType::Lunch, date(1)),
            Err(DrawerError::UnexpectedStep { actual: None, .. })
        ));
        assert!(matches!(
            closed.finish_save(),
            Err(DrawerError::NothingToSave { actual: None })
        ));
    }

    #[test]
    fn test_edit_entry_points() {
        let now = Utc::now();
        let line = MealFood {
            id: "line-1".to_string(),
            meal_id: "meal-1".to_string(),
            food_id: Some("f1".to_string()),
            portion_id: Some("p1".to_string()),
            food_name: "Oatmeal".to_string(),
            portion_display: "1 cup".to_string(),
            selected_addons: Some(vec!["a1".to_string()]),
            addons_display: Some(vec!["Honey".to_string()]),
            nutrition: Nutrition::new(364.0, 10.0, 71.0, 5.0),
            created_at: now,
        };

        let mut drawer = DrawerController::new();
        drawer.edit_meal_food(&line);
        let payload = drawer.payload().unwrap();
        assert!(payload.is_edit);
        assert_eq!(payload.meal_food_id.as_deref(), Some("line-1"));
        assert_eq!(payload.portion_id.as_deref(), Some("p1"));
        assert_eq!(payload.selected_addons, vec!["a1".to_string()]);

        let log = WeightLog {
            id: "w1".to_string(),
            user_id: "u1".to_string(),
            log_date: date(4),
            weight_kg: 71.2,
            notes: Some("after run".to_string()),
            created_at: now,
            updated_at: now,
        };
        drawer.edit_weight(&log);
        assert_eq!(drawer.kind(), Some(DrawerKind::WeightForm));
        assert_eq!(drawer.payload().unwrap().weight_kg, Some(71.2));
        assert_eq!(drawer.finish_save(), Ok(vec![RefreshEvent::Weight]));

        drawer.open_goals(None);
        assert_eq!(drawer.finish_save(), Ok(vec![RefreshEvent::Goals]));

        drawer.open_profile();
        assert_eq!(drawer.finish_save(), Ok(vec![RefreshEvent::Profile]));
    }

    #[test]
    fn test_meal_food_input_from_form() {
        let now = Utc::now();
        let picker = PortionPicker::new(FoodOptions {
            portions: vec![FoodPortion {
                id: "p1".to_string(),
                food_id: "f1".to_string(),
                display_name: "1 cup".to_string(),
                description: None,
                nutrition: Nutrition::new(300.0, 10.0, 54.0, 5.0),
                created_at: now,
                updated_at: now,
            }],
            addons: vec![],
        });

        let mut drawer = at_action_menu();
        assert!(drawer.meal_food_input(&picker).is_err());

        drawer.select_action(QuickAction::LogMeal, None).unwrap();
        drawer.select_meal_type(MealType::Lunch, date(7)).unwrap();
        drawer.select_food("f1", "Oatmeal").unwrap();

        let input = drawer.meal_food_input(&picker).unwrap();
        assert_eq!(input.meal_id, None);
        assert_eq!(input.meal_type, MealType::Lunch);
        assert_eq!(input.meal_date, date(7));
        assert_eq!(input.portion_id, "p1");
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&DrawerKind::CustomFoodForm).unwrap();
        assert_eq!(json, "\"custom-food-form\"");
    }
}

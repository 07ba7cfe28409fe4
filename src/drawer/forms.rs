//! Form input parsing
//!
//! Turns the raw text of the weight, goals, custom-food and profile forms
//! into write inputs, applying the same input patterns and ranges the forms
//! enforce while typing.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::storage::{CustomFoodInput, GoalInput, Nutrition, ProfileUpdate, WeightInput};

pub const MAX_WEIGHT_KG: f64 = 500.0;
pub const MAX_CUSTOM_CALORIES: i64 = 5000;
/// Height and age inputs are capped at this many digits
pub const MAX_PROFILE_DIGITS: usize = 3;

pub const ACTIVITY_LEVELS: &[&str] = &["sedentary", "light", "moderate", "active", "very_active"];

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field}: '{value}' is not a valid number")]
    Pattern { field: &'static str, value: String },

    #[error("{field} must be {range}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
    },

    #[error("{field}: unknown option '{value}'")]
    UnknownOption { field: &'static str, value: String },

    #[error("input pattern failed to compile: {0}")]
    InvalidPattern(String),
}

/// Compiled once; a pattern that fails to compile is reported on every use
fn pattern(
    cell: &'static OnceLock<Result<Regex, String>>,
    source: &str,
) -> Result<&'static Regex, FormError> {
    cell.get_or_init(|| Regex::new(source).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| FormError::InvalidPattern(e.clone()))
}

/// Up to two decimal places
fn two_decimals() -> Result<&'static Regex, FormError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    pattern(&RE, r"^\d*\.?\d{0,2}$")
}

/// Up to one decimal place
fn one_decimal() -> Result<&'static Regex, FormError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    pattern(&RE, r"^\d*\.?\d{0,1}$")
}

fn digits() -> Result<&'static Regex, FormError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    pattern(&RE, r"^\d+$")
}

/// Parse `raw` if it matches `re`; empty input is `None`
fn parse_number(field: &'static str, raw: &str, re: &Regex) -> Result<Option<f64>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let invalid = || FormError::Pattern {
        field,
        value: raw.to_string(),
    };
    if !re.is_match(raw) || raw == "." {
        return Err(invalid());
    }
    raw.parse::<f64>().map(Some).map_err(|_| invalid())
}

fn parse_integer(field: &'static str, raw: &str) -> Result<Option<i64>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let invalid = || FormError::Pattern {
        field,
        value: raw.to_string(),
    };
    if !digits()?.is_match(raw) {
        return Err(invalid());
    }
    raw.parse::<i64>().map(Some).map_err(|_| invalid())
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Weight in kg: two decimals, 0 < w <= 500
pub fn parse_weight(raw: &str) -> Result<f64, FormError> {
    let weight = parse_number("weight", raw, two_decimals()?)?.ok_or(FormError::Required("weight"))?;
    if weight <= 0.0 || weight > MAX_WEIGHT_KG {
        return Err(FormError::OutOfRange {
            field: "weight",
            range: "between 0 and 500 kg",
        });
    }
    Ok(weight)
}

pub fn parse_weight_form(
    weight: &str,
    log_date: NaiveDate,
    notes: Option<&str>,
) -> Result<WeightInput, FormError> {
    Ok(WeightInput {
        weight_kg: parse_weight(weight)?,
        log_date,
        notes: non_empty(notes),
    })
}

/// Raw goals form fields
#[derive(Debug, Clone, Default)]
pub struct GoalsForm<'a> {
    pub calories: &'a str,
    pub protein: &'a str,
    pub carbs: &'a str,
    pub fats: &'a str,
    /// Optional; empty means 0
    pub fiber: &'a str,
    pub reason: Option<&'a str>,
}

impl GoalsForm<'_> {
    pub fn parse(&self) -> Result<GoalInput, FormError> {
        let required = |field: &'static str, raw: &str| -> Result<f64, FormError> {
            parse_number(field, raw, one_decimal()?)?.ok_or(FormError::Required(field))
        };

        Ok(GoalInput {
            daily_calorie: parse_integer("calories", self.calories)?
                .ok_or(FormError::Required("calories"))?,
            daily_protein_g: required("protein", self.protein)?,
            daily_carbs_g: required("carbs", self.carbs)?,
            daily_fats_g: required("fats", self.fats)?,
            daily_fiber_g: parse_number("fiber", self.fiber, one_decimal()?)?.unwrap_or(0.0),
            reason: non_empty(self.reason),
        })
    }
}

/// Raw custom-food form fields
#[derive(Debug, Clone, Default)]
pub struct CustomFoodForm<'a> {
    pub name: &'a str,
    /// Empty means "1 serving"
    pub portion_name: &'a str,
    pub calories: &'a str,
    pub protein: &'a str,
    pub carbs: &'a str,
    pub fats: &'a str,
}

impl CustomFoodForm<'_> {
    pub fn parse(&self) -> Result<CustomFoodInput, FormError> {
        let name = non_empty(Some(self.name)).ok_or(FormError::Required("name"))?;

        let calories = parse_integer("calories", self.calories)?
            .ok_or(FormError::Required("calories"))?;
        if !(0..=MAX_CUSTOM_CALORIES).contains(&calories) {
            return Err(FormError::OutOfRange {
                field: "calories",
                range: "between 0 and 5000",
            });
        }

        let macro_g = |field: &'static str, raw: &str| -> Result<f64, FormError> {
            Ok(parse_number(field, raw, one_decimal()?)?.unwrap_or(0.0))
        };

        Ok(CustomFoodInput {
            display_name: name,
            portion_name: non_empty(Some(self.portion_name))
                .unwrap_or_else(crate::storage::types::default_portion_name),
            nutrition: Nutrition::new(
                calories as f64,
                macro_g("protein", self.protein)?,
                macro_g("carbs", self.carbs)?,
                macro_g("fats", self.fats)?,
            ),
        })
    }
}

/// Raw profile form fields; empty fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileForm<'a> {
    pub height_cm: &'a str,
    pub age: &'a str,
    pub activity_level: &'a str,
}

impl ProfileForm<'_> {
    pub fn parse(&self) -> Result<ProfileUpdate, FormError> {
        let capped = |field: &'static str, raw: &str| -> Result<Option<i64>, FormError> {
            let raw = raw.trim();
            if raw.len() > MAX_PROFILE_DIGITS {
                return Err(FormError::OutOfRange {
                    field,
                    range: "at most 3 digits",
                });
            }
            parse_integer(field, raw)
        };

        let activity_level = non_empty(Some(self.activity_level));
        if let Some(level) = &activity_level {
            if !ACTIVITY_LEVELS.contains(&level.as_str()) {
                return Err(FormError::UnknownOption {
                    field: "activity_level",
                    value: level.clone(),
                });
            }
        }

        Ok(ProfileUpdate {
            height_cm: capped("height", self.height_cm)?,
            age: capped("age", self.age)?,
            activity_level,
            ..Default::default()
        })
    }
}

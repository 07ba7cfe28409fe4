//! Data-entry drawers
//!
//! - **controller**: which drawer is open and what it carries
//! - **picker**: portion and add-on selection inside the food form
//! - **forms**: parsing of the free-text form fields

pub mod controller;
pub mod forms;
pub mod picker;

pub use controller::{DrawerController, DrawerError, DrawerKind, DrawerPayload, QuickAction};
pub use forms::{
    parse_weight, parse_weight_form, CustomFoodForm, FormError, GoalsForm, ProfileForm,
    ACTIVITY_LEVELS,
};
pub use picker::PortionPicker;

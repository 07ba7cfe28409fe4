//! API Routes
//!
//! Route handlers organized by functionality.

pub mod admin;
pub mod dashboard;
pub mod foods;
pub mod goals;
pub mod health;
pub mod meals;
pub mod profile;
pub mod weight;

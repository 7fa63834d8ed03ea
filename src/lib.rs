//! Nutrition targets and weekly meal plans.
//!
//! A [`models::Profile`] is turned into daily calorie and protein targets using
//! the bracket tables of an online calorie calculator, then a seven-day plan is
//! filled from a recipe catalog. See [`client::DietCraftClient`] for the
//! end-to-end entry point.

pub mod brackets;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod menu;
pub mod models;
pub mod planner;
pub mod requirements;
pub mod shopping;
pub mod transport;

pub use client::{DietCraftClient, PlanOutcome, PlannedWeek};
pub use config::DietCraftConfig;
pub use error::{DietError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DietError, Result};
use crate::models::Goal;

pub const DEFAULT_CALCULATOR_URL: &str = "https://www.calculator.net/calorie-calculator.html";
pub const DEFAULT_CATALOG_URL: &str = "https://api.spoonacular.com/recipes/complexSearch";
pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPLETIONS_MODEL: &str = "gpt-4o-mini";

/// Everything the pipeline needs to talk to its upstreams and shape a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietCraftConfig {
    pub calculator_url: String,
    pub catalog_url: String,
    pub catalog_api_key: String,
    pub completions_url: String,
    pub completions_model: String,
    /// Chat-completions key; only needed for shopping lists
    pub completions_api_key: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    pub protein: ProteinMultipliers,
    pub plan: PlanConfig,
}

/// Grams of daily protein per lb of body weight, by goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProteinMultipliers {
    pub gain: f64,
    pub maintain: f64,
    pub lose: f64,
}

impl ProteinMultipliers {
    pub fn for_goal(&self, goal: Goal) -> f64 {
        match goal {
            Goal::Gain => self.gain,
            Goal::Maintain => self.maintain,
            Goal::Lose => self.lose,
        }
    }
}

impl Default for ProteinMultipliers {
    fn default() -> Self {
        Self {
            gain: 0.9,
            maintain: 0.5,
            lose: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub name: String,
    /// Share of the post-snack daily budget
    pub fraction: f64,
    /// Catalog meal-type tags, e.g. "main course"
    pub meal_types: Vec<String>,
}

impl SlotConfig {
    fn new(name: &str, fraction: f64, meal_types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fraction,
            meal_types: meal_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// A fixed item eaten every day outside the catalog slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnackConfig {
    pub slot_name: String,
    pub title: String,
    pub calories: u32,
    pub protein: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub slots: Vec<SlotConfig>,
    pub snack: SnackConfig,
    /// Maximum times one recipe may appear in a week
    pub repetition_cap: u32,
    /// Candidates fetched per slot
    pub candidates_per_slot: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            slots: vec![
                SlotConfig::new("breakfast", 0.30, &["breakfast"]),
                SlotConfig::new("lunch", 0.35, &["main course", "salad", "soup"]),
                SlotConfig::new("dinner", 0.35, &["main course"]),
            ],
            snack: SnackConfig {
                slot_name: "snack".to_string(),
                title: "Protein shake".to_string(),
                calories: 200,
                protein: 25,
            },
            repetition_cap: 4,
            candidates_per_slot: 100,
        }
    }
}

impl PlanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(DietError::Config("at least one meal slot is required".into()));
        }
        if self.slots.iter().any(|s| !(s.fraction.is_finite() && s.fraction >= 0.0)) {
            return Err(DietError::Config("slot fractions must be non-negative".into()));
        }
        let total: f64 = self.slots.iter().map(|s| s.fraction).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(DietError::Config(format!(
                "slot fractions must sum to 1.0, got {total}"
            )));
        }
        if self.repetition_cap == 0 {
            return Err(DietError::Config("repetition cap must be positive".into()));
        }
        if self.candidates_per_slot == 0 {
            return Err(DietError::Config(
                "candidates per slot must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DietCraftConfig {
    fn default() -> Self {
        Self {
            calculator_url: DEFAULT_CALCULATOR_URL.to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_api_key: String::new(),
            completions_url: DEFAULT_COMPLETIONS_URL.to_string(),
            completions_model: DEFAULT_COMPLETIONS_MODEL.to_string(),
            completions_api_key: None,
            request_timeout_secs: 30,
            protein: ProteinMultipliers::default(),
            plan: PlanConfig::default(),
        }
    }
}

impl DietCraftConfig {
    /// Load from the process environment, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self {
            catalog_api_key: std::env::var("SPOONACULAR_API_KEY").map_err(|_| {
                DietError::Config("SPOONACULAR_API_KEY environment variable is required".into())
            })?,
            completions_api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..Self::default()
        };

        if let Ok(url) = std::env::var("DIETCRAFT_CALCULATOR_URL") {
            config.calculator_url = url;
        }
        if let Ok(url) = std::env::var("DIETCRAFT_CATALOG_URL") {
            config.catalog_url = url;
        }
        if let Ok(url) = std::env::var("DIETCRAFT_COMPLETIONS_URL") {
            config.completions_url = url;
        }
        if let Ok(secs) = std::env::var("DIETCRAFT_TIMEOUT_SECS") {
            config.request_timeout_secs = secs.parse().map_err(|_| {
                DietError::Config(format!("DIETCRAFT_TIMEOUT_SECS must be a number, got '{secs}'"))
            })?;
        }
        if let Ok(cap) = std::env::var("DIETCRAFT_REPETITION_CAP") {
            config.plan.repetition_cap = cap.parse().map_err(|_| {
                DietError::Config(format!(
                    "DIETCRAFT_REPETITION_CAP must be a number, got '{cap}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog_api_key.is_empty() {
            return Err(DietError::Config("recipe catalog API key cannot be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(DietError::Config("request timeout must be positive".into()));
        }
        self.plan.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

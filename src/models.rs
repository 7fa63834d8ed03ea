use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DietError, Result};

/// Biological sex as understood by the calorie calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Single-letter code sent to the calculator (`csex`).
    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "m",
            Self::Female => "f",
        }
    }
}

impl FromStr for Sex {
    type Err = DietError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(DietError::InvalidInput(format!("unknown sex '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

impl FromStr for ActivityLevel {
    type Err = DietError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Ok(Self::Sedentary),
            "light" => Ok(Self::Light),
            "moderate" => Ok(Self::Moderate),
            "active" => Ok(Self::Active),
            other => Err(DietError::InvalidInput(format!(
                "unknown activity level '{other}'"
            ))),
        }
    }
}

/// What the user wants their body weight to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Gain,
    Maintain,
    Lose,
}

impl FromStr for Goal {
    type Err = DietError;

    fn from_str(s: &str) -> Result<Self> {
        // The settings form offers "Gain Muscle" / "Maintain Muscle".
        match s.trim().to_ascii_lowercase().as_str() {
            "gain" | "gain muscle" => Ok(Self::Gain),
            "maintain" | "maintain muscle" => Ok(Self::Maintain),
            "lose" | "lose weight" => Ok(Self::Lose),
            other => Err(DietError::InvalidInput(format!("unknown goal '{other}'"))),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gain => "gain",
            Self::Maintain => "maintain",
            Self::Lose => "lose",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Height {
    pub feet: u32,
    pub inches: u32,
}

/// A user's body profile, as kept by the profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub age: u32,
    pub sex: Sex,
    pub height: Height,
    /// Current weight in lbs
    pub current_weight: f64,
    /// Desired weight in lbs
    pub desired_weight: f64,
    /// Weeks allowed to reach the desired weight
    pub time_frame_weeks: u32,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

impl Profile {
    pub fn validate(&self) -> Result<()> {
        if self.age == 0 {
            return Err(DietError::InvalidInput("age must be positive".into()));
        }
        if self.time_frame_weeks == 0 {
            return Err(DietError::InvalidInput(
                "time frame must be at least one week".into(),
            ));
        }
        for (name, w) in [
            ("current weight", self.current_weight),
            ("desired weight", self.desired_weight),
        ] {
            if !(w.is_finite() && w > 0.0) {
                return Err(DietError::InvalidInput(format!(
                    "{name} must be a positive number, got {w}"
                )));
            }
        }
        if self.height.inches > 11 {
            return Err(DietError::InvalidInput(format!(
                "height inches must be 0-11, got {}",
                self.height.inches
            )));
        }
        Ok(())
    }
}

/// One row of a calculator bracket table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalorieBracketRow {
    /// e.g. "Mild weight loss"
    pub label: String,
    /// e.g. "0.5 lb/week"; the maintenance row has none
    pub weekly_change: Option<String>,
    pub calories_per_day: u32,
}

/// Loss and gain bracket tables, each ordered from smallest to largest change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTables {
    pub loss: Vec<CalorieBracketRow>,
    pub gain: Vec<CalorieBracketRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CalorieTarget {
    /// Daily calorie intake (kcal)
    Calories(u32),
    /// Keep eating at maintenance; no bracket applies
    Maintaining,
    /// The requested rate of change is unsafe
    NotSuggested,
}

impl CalorieTarget {
    pub fn calories(self) -> Option<u32> {
        match self {
            Self::Calories(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for CalorieTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calories(c) => write!(f, "{c}"),
            Self::Maintaining => f.write_str("Maintaining"),
            Self::NotSuggested => f.write_str("Not Suggested"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequirementResult {
    pub daily_calories: CalorieTarget,
    /// Daily protein (g)
    pub daily_protein: f64,
}

/// A recipe returned by the catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: u64,
    pub title: String,
    /// Calories per serving (kcal)
    pub calories: f64,
    /// Protein per serving (g)
    pub protein: f64,
    pub url: Option<String>,
}

/// Budget and recipe filter for one meal slot of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlotRequirement {
    pub slot_name: String,
    pub calorie_budget: u32,
    pub protein_budget: u32,
    pub allowed_recipe_types: Vec<String>,
    pub min_calories: u32,
    pub max_calories: u32,
}

pub const NO_RECIPE_FOUND: &str = "No recipe found";

/// One cell of a weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    /// Catalog id; `None` for the snack and for placeholder cells
    pub recipe_id: Option<u64>,
    pub title: String,
    pub calories: f64,
    pub protein: f64,
    pub url: Option<String>,
}

impl PlannedMeal {
    pub fn no_recipe_found() -> Self {
        Self {
            recipe_id: None,
            title: NO_RECIPE_FOUND.to_string(),
            calories: 0.0,
            protein: 0.0,
            url: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.recipe_id.is_none() && self.title == NO_RECIPE_FOUND
    }
}

impl From<&Recipe> for PlannedMeal {
    fn from(recipe: &Recipe) -> Self {
        Self {
            recipe_id: Some(recipe.id),
            title: recipe.title.clone(),
            calories: recipe.calories,
            protein: recipe.protein,
            url: recipe.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub slot: String,
    pub meal: PlannedMeal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// "Day 1" .. "Day 7"
    pub label: String,
    pub meals: Vec<SlotAssignment>,
}

impl DayPlan {
    pub fn meal(&self, slot: &str) -> Option<&PlannedMeal> {
        self.meals.iter().find(|m| m.slot == slot).map(|m| &m.meal)
    }

    pub fn total_calories(&self) -> f64 {
        self.meals.iter().map(|m| m.meal.calories).sum()
    }

    pub fn total_protein(&self) -> f64 {
        self.meals.iter().map(|m| m.meal.protein).sum()
    }
}

/// Day-by-day, slot-by-slot meal assignments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub days: Vec<DayPlan>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlanRow {
    day: String,
    slot: String,
    recipe_id: Option<u64>,
    title: String,
    calories: f64,
    protein: f64,
    url: Option<String>,
}

impl WeeklyPlan {
    pub fn day(&self, label: &str) -> Option<&DayPlan> {
        self.days.iter().find(|d| d.label == label)
    }

    pub fn meal(&self, day: &str, slot: &str) -> Option<&PlannedMeal> {
        self.day(day).and_then(|d| d.meal(slot))
    }

    pub fn placeholder_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|d| &d.meals)
            .filter(|m| m.meal.is_placeholder())
            .count()
    }

    /// Flatten to a `day,slot,recipe_id,title,calories,protein,url` table.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for day in &self.days {
            for assignment in &day.meals {
                let meal = &assignment.meal;
                writer
                    .serialize(PlanRow {
                        day: day.label.clone(),
                        slot: assignment.slot.clone(),
                        recipe_id: meal.recipe_id,
                        title: meal.title.clone(),
                        calories: meal.calories,
                        protein: meal.protein,
                        url: meal.url.clone(),
                    })
                    .map_err(|e| DietError::Parse(format!("failed to write plan row: {e}")))?;
            }
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DietError::Parse(format!("failed to flush plan csv: {e}")))?;
        String::from_utf8(bytes).map_err(|e| DietError::Parse(e.to_string()))
    }

    /// Rebuild a plan from the table written by [`WeeklyPlan::to_csv`].
    pub fn from_csv(data: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let mut plan = WeeklyPlan::default();

        for record in reader.deserialize::<PlanRow>() {
            let row = record.map_err(|e| DietError::Parse(format!("bad plan row: {e}")))?;
            let meal = PlannedMeal {
                recipe_id: row.recipe_id,
                title: row.title,
                calories: row.calories,
                protein: row.protein,
                url: row.url,
            };

            let idx = match plan.days.iter().position(|d| d.label == row.day) {
                Some(idx) => idx,
                None => {
                    plan.days.push(DayPlan {
                        label: row.day,
                        meals: Vec::new(),
                    });
                    plan.days.len() - 1
                }
            };
            plan.days[idx].meals.push(SlotAssignment {
                slot: row.slot,
                meal,
            });
        }

        Ok(plan)
    }
}

/// One meal of a plan written by a text generator rather than picked from
/// the recipe catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenMeal {
    #[serde(rename = "Day")]
    pub day: String,
    /// Breakfast, Lunch, Dinner or Snack
    #[serde(rename = "Type")]
    pub meal_type: String,
    #[serde(rename = "Details")]
    pub details: String,
    #[serde(rename = "Calories")]
    pub calories: f64,
    #[serde(rename = "Carbs")]
    pub carbs: f64,
    #[serde(rename = "Protein")]
    pub protein: f64,
    #[serde(rename = "Fat")]
    pub fat: f64,
}

/// A free-form week of meals, in the order the generator wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrittenPlan {
    pub meals: Vec<WrittenMeal>,
}

impl WrittenPlan {
    /// Days in first-seen order.
    pub fn days(&self) -> Vec<&str> {
        let mut days: Vec<&str> = Vec::new();
        for meal in &self.meals {
            if !days.contains(&meal.day.as_str()) {
                days.push(&meal.day);
            }
        }
        days
    }

    pub fn meals_on<'a>(&'a self, day: &'a str) -> impl Iterator<Item = &'a WrittenMeal> + 'a {
        self.meals.iter().filter(move |m| m.day == day)
    }

    pub fn total_calories(&self, day: &str) -> f64 {
        self.meals_on(day).map(|m| m.calories).sum()
    }

    pub fn total_protein(&self, day: &str) -> f64 {
        self.meals_on(day).map(|m| m.protein).sum()
    }

    /// `Day,Type,Details,Calories,Carbs,Protein,Fat` table.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for meal in &self.meals {
            writer
                .serialize(meal)
                .map_err(|e| DietError::Parse(format!("failed to write plan row: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DietError::Parse(format!("failed to flush plan csv: {e}")))?;
        String::from_utf8(bytes).map_err(|e| DietError::Parse(e.to_string()))
    }
}

/// One line of a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub item: String,
    pub quantity: String,
}

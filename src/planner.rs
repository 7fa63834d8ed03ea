use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::catalog::RecipeCatalogClient;
use crate::config::{PlanConfig, SnackConfig};
use crate::error::Result;
use crate::models::{
    DayPlan, Goal, MealSlotRequirement, PlannedMeal, Recipe, SlotAssignment, WeeklyPlan,
};

pub const DAYS_PER_WEEK: usize = 7;

/// Split `total` by `fractions`, flooring each share and giving the remainder
/// to the slot with the largest fraction (the first one on ties).
///
/// The shares always sum to `total`.
pub fn split_budget(total: u32, fractions: &[f64]) -> Vec<u32> {
    let mut shares: Vec<u32> = fractions
        .iter()
        .map(|f| (f64::from(total) * f).floor().max(0.0) as u32)
        .collect();

    let Some(largest) = fractions
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, &f)| match best {
            Some((_, b)) if b >= f => best,
            _ => Some((idx, f)),
        })
        .map(|(idx, _)| idx)
    else {
        return shares;
    };

    let assigned: u32 = shares.iter().sum();
    if assigned <= total {
        shares[largest] += total - assigned;
    } else {
        shares[largest] = shares[largest].saturating_sub(assigned - total);
    }
    shares
}

/// Calorie window around a slot target, shifted by goal.
pub fn calorie_window(goal: Goal, target: u32) -> (u32, u32) {
    match goal {
        Goal::Gain => (target, target + 100),
        Goal::Lose => (target.saturating_sub(100), target),
        Goal::Maintain => (target.saturating_sub(50), target + 50),
    }
}

/// Per-slot budgets after the fixed snack is taken out of the daily totals.
pub fn slot_requirements(
    config: &PlanConfig,
    daily_calories: u32,
    daily_protein: f64,
    goal: Goal,
) -> Vec<MealSlotRequirement> {
    let snack = &config.snack;
    let calories = daily_calories.saturating_sub(snack.calories);
    let protein = (daily_protein - f64::from(snack.protein)).max(0.0).floor() as u32;

    let fractions: Vec<f64> = config.slots.iter().map(|s| s.fraction).collect();
    let calorie_shares = split_budget(calories, &fractions);
    let protein_shares = split_budget(protein, &fractions);

    config
        .slots
        .iter()
        .zip(calorie_shares.into_iter().zip(protein_shares))
        .map(|(slot, (calorie_budget, protein_budget))| {
            let (min_calories, max_calories) = calorie_window(goal, calorie_budget);
            MealSlotRequirement {
                slot_name: slot.name.clone(),
                calorie_budget,
                protein_budget,
                allowed_recipe_types: slot.meal_types.clone(),
                min_calories,
                max_calories,
            }
        })
        .collect()
}

/// Weekly and same-day recipe usage.
struct UsageTracker {
    cap: u32,
    weekly: HashMap<u64, u32>,
    today: HashSet<u64>,
}

impl UsageTracker {
    fn new(cap: u32) -> Self {
        Self {
            cap,
            weekly: HashMap::new(),
            today: HashSet::new(),
        }
    }

    fn start_day(&mut self) {
        self.today.clear();
    }

    fn available(&self, id: u64) -> bool {
        !self.today.contains(&id) && self.weekly.get(&id).copied().unwrap_or(0) < self.cap
    }

    fn record(&mut self, id: u64) {
        *self.weekly.entry(id).or_insert(0) += 1;
        self.today.insert(id);
    }
}

fn snack_meal(snack: &SnackConfig) -> PlannedMeal {
    PlannedMeal {
        recipe_id: None,
        title: snack.title.clone(),
        calories: f64::from(snack.calories),
        protein: f64::from(snack.protein),
        url: None,
    }
}

/// Fill seven days from cached per-slot candidates.
///
/// Each cell takes the first candidate used fewer than `repetition_cap` times
/// this week and not yet today; otherwise it gets the placeholder.
pub fn fill_week(
    slots: &[MealSlotRequirement],
    candidates: &[Vec<Recipe>],
    repetition_cap: u32,
    snack: Option<&SnackConfig>,
) -> WeeklyPlan {
    let mut usage = UsageTracker::new(repetition_cap);
    let mut days = Vec::with_capacity(DAYS_PER_WEEK);

    for day in 1..=DAYS_PER_WEEK {
        usage.start_day();
        let mut meals = Vec::with_capacity(slots.len() + 1);

        for (slot, pool) in slots.iter().zip(candidates) {
            let meal = match pool.iter().find(|r| usage.available(r.id)) {
                Some(recipe) => {
                    usage.record(recipe.id);
                    PlannedMeal::from(recipe)
                }
                None => {
                    debug!(day, slot = %slot.slot_name, "no recipe left for slot");
                    PlannedMeal::no_recipe_found()
                }
            };
            meals.push(SlotAssignment {
                slot: slot.slot_name.clone(),
                meal,
            });
        }

        if let Some(snack) = snack {
            meals.push(SlotAssignment {
                slot: snack.slot_name.clone(),
                meal: snack_meal(snack),
            });
        }

        days.push(DayPlan {
            label: format!("Day {day}"),
            meals,
        });
    }

    WeeklyPlan { days }
}

/// Builds a week of meals from daily targets and the recipe catalog.
#[derive(Clone)]
pub struct WeeklyPlanAssembler {
    catalog: RecipeCatalogClient,
    config: PlanConfig,
}

impl WeeklyPlanAssembler {
    pub fn new(catalog: RecipeCatalogClient, config: PlanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub async fn assemble(
        &self,
        daily_calories: u32,
        daily_protein: f64,
        goal: Goal,
    ) -> Result<WeeklyPlan> {
        let slots = slot_requirements(&self.config, daily_calories, daily_protein, goal);

        // One query per slot, shared by all seven days.
        let candidates = try_join_all(slots.iter().map(|slot| {
            self.catalog.search(
                slot.min_calories,
                slot.max_calories,
                slot.protein_budget,
                &slot.allowed_recipe_types,
                self.config.candidates_per_slot,
            )
        }))
        .await?;

        let plan = fill_week(
            &slots,
            &candidates,
            self.config.repetition_cap,
            Some(&self.config.snack),
        );
        info!(
            daily_calories,
            daily_protein,
            %goal,
            placeholders = plan.placeholder_count(),
            "assembled weekly plan"
        );
        Ok(plan)
    }
}

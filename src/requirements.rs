use tracing::debug;

use crate::config::ProteinMultipliers;
use crate::error::{DietError, Result};
use crate::models::{
    BracketTables, CalorieBracketRow, CalorieTarget, Goal, Profile, RequirementResult,
};

/// Weekly change at or above this (lbs/week) is never suggested.
pub const MAX_SAFE_RATE: f64 = 2.5;
const EXTREME_ABOVE: f64 = 1.8;
const STANDARD_ABOVE: f64 = 0.8;
const MILD_ABOVE: f64 = 0.2;

/// Calculator bracket, identified by the vocabulary of its row label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Maintain,
    Mild,
    Standard,
    Extreme,
}

impl Bracket {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase();
        if label.contains("maintain") {
            Some(Self::Maintain)
        } else if label.contains("mild") {
            Some(Self::Mild)
        } else if label.contains("extreme") || label.contains("fast") {
            Some(Self::Extreme)
        } else if label.contains("weight loss") || label.contains("weight gain") {
            Some(Self::Standard)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Loss,
    Gain,
}

impl Direction {
    fn table(self, tables: &BracketTables) -> &[CalorieBracketRow] {
        match self {
            Self::Loss => &tables.loss,
            Self::Gain => &tables.gain,
        }
    }

    /// Row position of a bracket when the table carries no known labels.
    /// The gain table has no maintenance row.
    fn position(self, bracket: Bracket) -> Option<usize> {
        match (self, bracket) {
            (Self::Loss, Bracket::Maintain) => Some(0),
            (Self::Loss, Bracket::Mild) => Some(1),
            (Self::Loss, Bracket::Standard) => Some(2),
            (Self::Loss, Bracket::Extreme) => Some(3),
            (Self::Gain, Bracket::Maintain) => None,
            (Self::Gain, Bracket::Mild) => Some(0),
            (Self::Gain, Bracket::Standard) => Some(1),
            (Self::Gain, Bracket::Extreme) => Some(2),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Loss => "loss",
            Self::Gain => "gain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateBand {
    NotSuggested,
    Bracket(Bracket),
    Maintaining,
}

/// First matching band wins; the unsafe check is a closed lower bound.
fn rate_band(lbs_per_week: f64) -> RateBand {
    if lbs_per_week >= MAX_SAFE_RATE {
        RateBand::NotSuggested
    } else if lbs_per_week > EXTREME_ABOVE {
        RateBand::Bracket(Bracket::Extreme)
    } else if lbs_per_week > STANDARD_ABOVE {
        RateBand::Bracket(Bracket::Standard)
    } else if lbs_per_week > MILD_ABOVE {
        RateBand::Bracket(Bracket::Mild)
    } else {
        RateBand::Maintaining
    }
}

/// Calories for `bracket`, found by label first.
///
/// When no row carries the bracket's label, the row at the bracket's usual
/// position is used, but only if its own label is unrecognized. A table can
/// therefore mix labelled and unlabelled rows.
fn lookup(tables: &BracketTables, direction: Direction, bracket: Bracket) -> Result<u32> {
    let table = direction.table(tables);
    let row = table
        .iter()
        .find(|row| Bracket::from_label(&row.label) == Some(bracket))
        .or_else(|| {
            direction
                .position(bracket)
                .and_then(|idx| table.get(idx))
                .filter(|row| Bracket::from_label(&row.label).is_none())
        });

    row.map(|r| r.calories_per_day).ok_or_else(|| {
        DietError::Parse(format!(
            "{} table ({} rows) has no {:?} bracket",
            direction.name(),
            table.len(),
            bracket
        ))
    })
}

/// Maintenance intake: the loss table's "Maintain weight" row.
pub fn maintenance_calories(tables: &BracketTables) -> Result<u32> {
    lookup(tables, Direction::Loss, Bracket::Maintain)
}

/// Turns a profile into daily calorie and protein targets.
#[derive(Debug, Clone, Default)]
pub struct RequirementCalculator {
    protein: ProteinMultipliers,
}

impl RequirementCalculator {
    pub fn new(protein: ProteinMultipliers) -> Self {
        Self { protein }
    }

    pub fn compute_calorie_target(
        &self,
        profile: &Profile,
        tables: &BracketTables,
    ) -> Result<CalorieTarget> {
        if profile.time_frame_weeks == 0 {
            return Err(DietError::InvalidInput(
                "time frame must be at least one week".into(),
            ));
        }

        let (direction, delta) = if profile.desired_weight < profile.current_weight {
            (Direction::Loss, profile.current_weight - profile.desired_weight)
        } else if profile.desired_weight > profile.current_weight {
            (Direction::Gain, profile.desired_weight - profile.current_weight)
        } else {
            return Ok(CalorieTarget::Maintaining);
        };

        let rate = delta / f64::from(profile.time_frame_weeks);
        let band = rate_band(rate);
        debug!(direction = direction.name(), rate, ?band, "selected rate band");

        match band {
            RateBand::NotSuggested => Ok(CalorieTarget::NotSuggested),
            RateBand::Maintaining => Ok(CalorieTarget::Maintaining),
            RateBand::Bracket(bracket) => {
                lookup(tables, direction, bracket).map(CalorieTarget::Calories)
            }
        }
    }

    /// Daily protein in grams: body weight (lbs) times the goal's multiplier.
    pub fn compute_protein_target(&self, goal: Goal, current_weight: f64) -> f64 {
        current_weight * self.protein.for_goal(goal)
    }

    pub fn evaluate(&self, profile: &Profile, tables: &BracketTables) -> Result<RequirementResult> {
        Ok(RequirementResult {
            daily_calories: self.compute_calorie_target(profile, tables)?,
            daily_protein: self.compute_protein_target(profile.goal, profile.current_weight),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Height, Sex};

    fn profile(current: f64, desired: f64, weeks: u32) -> Profile {
        Profile {
            age: 25,
            sex: Sex::Male,
            height: Height { feet: 5, inches: 10 },
            current_weight: current,
            desired_weight: desired,
            time_frame_weeks: weeks,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::Lose,
        }
    }

    fn unlabelled(calories: &[u32]) -> Vec<CalorieBracketRow> {
        calories
            .iter()
            .map(|&c| CalorieBracketRow {
                label: "…".into(),
                weekly_change: None,
                calories_per_day: c,
            })
            .collect()
    }

    fn labelled_tables() -> BracketTables {
        let row = |label: &str, calories| CalorieBracketRow {
            label: label.into(),
            weekly_change: None,
            calories_per_day: calories,
        };
        BracketTables {
            // Deliberately shuffled: label identity must not depend on order.
            loss: vec![
                row("Maintain weight", 2639),
                row("Extreme weight loss", 1639),
                row("Mild weight loss", 2389),
                row("Weight loss", 2139),
            ],
            gain: vec![
                row("Mild weight gain", 2889),
                row("Weight gain", 3139),
                row("Fast Weight gain", 3639),
            ],
        }
    }

    #[test]
    fn moderate_loss_picks_the_third_loss_row() {
        let tables = BracketTables {
            loss: unlabelled(&[2500, 2200, 1900, 1600]),
            gain: unlabelled(&[2800, 3100, 3600]),
        };
        let calc = RequirementCalculator::default();
        let target = calc
            .compute_calorie_target(&profile(180.0, 160.0, 12), &tables)
            .unwrap();
        assert_eq!(target, CalorieTarget::Calories(1900));
    }

    #[test]
    fn equal_weights_maintain_without_lookup() {
        let calc = RequirementCalculator::default();
        let empty = BracketTables::default();
        let target = calc
            .compute_calorie_target(&profile(170.0, 170.0, 8), &empty)
            .unwrap();
        assert_eq!(target, CalorieTarget::Maintaining);
    }

    #[test]
    fn rate_of_two_and_a_half_is_not_suggested() {
        let calc = RequirementCalculator::default();
        let tables = labelled_tables();
        // 10 lbs over 4 weeks, both directions
        assert_eq!(
            calc.compute_calorie_target(&profile(180.0, 170.0, 4), &tables)
                .unwrap(),
            CalorieTarget::NotSuggested
        );
        assert_eq!(
            calc.compute_calorie_target(&profile(150.0, 160.0, 4), &tables)
                .unwrap(),
            CalorieTarget::NotSuggested
        );
    }

    #[test]
    fn brackets_resolve_by_label() {
        let calc = RequirementCalculator::default();
        let tables = labelled_tables();
        let cases = [
            (180.0, 178.0, 4, CalorieTarget::Calories(2389)),
            (180.0, 176.0, 4, CalorieTarget::Calories(2139)),
            (180.0, 172.0, 4, CalorieTarget::Calories(1639)),
            (180.0, 179.5, 4, CalorieTarget::Maintaining),
            (150.0, 152.0, 4, CalorieTarget::Calories(2889)),
            (150.0, 170.0, 12, CalorieTarget::Calories(3139)),
            (150.0, 158.0, 4, CalorieTarget::Calories(3639)),
            // band upper bounds are inclusive
            (180.0, 162.0, 10, CalorieTarget::Calories(2139)),
            (180.0, 172.0, 10, CalorieTarget::Calories(2389)),
            (180.0, 178.0, 10, CalorieTarget::Maintaining),
            (150.0, 168.0, 10, CalorieTarget::Calories(3139)),
            (150.0, 158.0, 10, CalorieTarget::Calories(2889)),
            (150.0, 152.0, 10, CalorieTarget::Maintaining),
        ];
        for (current, desired, weeks, expected) in cases {
            let got = calc
                .compute_calorie_target(&profile(current, desired, weeks), &tables)
                .unwrap();
            assert_eq!(got, expected, "{current} -> {desired} over {weeks} weeks");
        }
    }

    #[test]
    fn partially_labelled_table_falls_back_per_bracket() {
        let calc = RequirementCalculator::default();
        let mut loss = unlabelled(&[2500, 2200, 1900, 1600]);
        loss[0].label = "Maintain weight".into();
        loss[3].label = "Extreme weight loss".into();
        let tables = BracketTables {
            loss,
            gain: Vec::new(),
        };

        let cases = [
            (180.0, 178.0, 4, CalorieTarget::Calories(2200)),
            (180.0, 176.0, 4, CalorieTarget::Calories(1900)),
            (180.0, 172.0, 4, CalorieTarget::Calories(1600)),
        ];
        for (current, desired, weeks, expected) in cases {
            let got = calc
                .compute_calorie_target(&profile(current, desired, weeks), &tables)
                .unwrap();
            assert_eq!(got, expected, "{current} -> {desired} over {weeks} weeks");
        }
        assert_eq!(maintenance_calories(&tables).unwrap(), 2500);
    }

    #[test]
    fn positional_row_with_another_label_is_not_borrowed() {
        let calc = RequirementCalculator::default();
        let mut loss = unlabelled(&[2500, 2200, 1900, 1600]);
        loss[2].label = "Extreme weight loss".into();
        let tables = BracketTables {
            loss,
            gain: Vec::new(),
        };
        // standard bracket sits at index 2, which is labelled extreme
        let err = calc
            .compute_calorie_target(&profile(180.0, 172.0, 8), &tables)
            .unwrap_err();
        assert!(matches!(err, DietError::Parse(_)));
    }

    #[test]
    fn short_table_is_a_parse_error() {
        let calc = RequirementCalculator::default();
        let tables = BracketTables {
            loss: unlabelled(&[2500, 2200]),
            gain: Vec::new(),
        };
        let err = calc
            .compute_calorie_target(&profile(180.0, 160.0, 12), &tables)
            .unwrap_err();
        assert!(matches!(err, DietError::Parse(_)));
    }

    #[test]
    fn protein_uses_goal_multiplier() {
        let calc = RequirementCalculator::default();
        assert_eq!(calc.compute_protein_target(Goal::Maintain, 160.0), 80.0);
        assert_eq!(calc.compute_protein_target(Goal::Gain, 200.0), 180.0);

        let custom = RequirementCalculator::new(ProteinMultipliers {
            gain: 1.0,
            maintain: 0.8,
            lose: 0.5,
        });
        assert_eq!(custom.compute_protein_target(Goal::Maintain, 160.0), 128.0);
    }

    #[test]
    fn maintenance_row_found_by_label() {
        assert_eq!(maintenance_calories(&labelled_tables()).unwrap(), 2639);
    }
}

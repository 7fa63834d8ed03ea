use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{DietError, Result};
use crate::models::{WrittenMeal, WrittenPlan};
use crate::shopping::{strip_code_fence, TextGenerator};

const WRITTEN_PLAN_MAX_TOKENS: u32 = 1000;
const COLUMNS: usize = 7;

/// Asks a text generator for a Monday-to-Sunday plan that meets daily
/// calorie and protein targets directly, without the recipe catalog.
#[derive(Clone)]
pub struct PlanWriter {
    generator: Arc<dyn TextGenerator>,
}

impl PlanWriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn write_week(&self, daily_calories: u32, daily_protein: u32) -> Result<WrittenPlan> {
        let prompt = written_plan_prompt(daily_calories, daily_protein);
        let reply = self
            .generator
            .complete(&prompt, WRITTEN_PLAN_MAX_TOKENS)
            .await?;
        let plan = parse_written_plan(&reply)?;
        debug!(
            daily_calories,
            daily_protein,
            meals = plan.meals.len(),
            days = plan.days().len(),
            "wrote weekly plan"
        );
        Ok(plan)
    }
}

pub fn written_plan_prompt(daily_calories: u32, daily_protein: u32) -> String {
    format!(
        "Create a weekly diet plan (from Monday to Sunday) with no more than {daily_calories} \
         calories per day and at least {daily_protein} grams of protein per day. \
         Format the response as a csv with the following columns: 'Day', \
         'Type (Breakfast, Lunch, Dinner, Snack)', 'Details', 'Calories', 'Carbs', \
         'Protein', 'Fat'. Ensure that each field is properly quoted if it contains \
         commas and only contains the csv, without code fences."
    )
}

/// Leading number of a cell such as `450`, `32g` or `12.5 g`.
fn leading_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let end = cell
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(cell.len());
    cell[..end].parse().ok()
}

/// Parse the generator's seven-column reply.
///
/// The first `Day` header row is dropped wherever it appears. Rows that are
/// too short or carry non-numeric nutrition are skipped; unquoted commas in
/// the details column are folded back into it. A reply with no usable rows is
/// a parse error.
pub fn parse_written_plan(text: &str) -> Result<WrittenPlan> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(strip_code_fence(text).as_bytes());

    let mut meals = Vec::new();
    let mut header_seen = false;
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DietError::Parse(format!("bad plan row: {e}")))?;
        let fields: Vec<&str> = record.iter().collect();

        if fields.len() < COLUMNS {
            if fields.iter().any(|f| !f.is_empty()) {
                warn!(row = idx, fields = fields.len(), "skipping short plan row");
            }
            continue;
        }
        if !header_seen && fields[0].eq_ignore_ascii_case("day") {
            header_seen = true;
            continue;
        }

        let numbers = &fields[fields.len() - 4..];
        let Some(&[calories, carbs, protein, fat]) = numbers
            .iter()
            .map(|cell| leading_number(cell))
            .collect::<Option<Vec<f64>>>()
            .as_deref()
        else {
            warn!(row = idx, "skipping plan row with non-numeric nutrition");
            continue;
        };

        meals.push(WrittenMeal {
            day: fields[0].to_string(),
            meal_type: fields[1].to_string(),
            details: fields[2..fields.len() - 4].join(", "),
            calories,
            carbs,
            protein,
            fat,
        });
    }

    if meals.is_empty() {
        return Err(DietError::Parse("generated plan has no meal rows".into()));
    }
    Ok(WrittenPlan { meals })
}

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DietError, Result};
use crate::models::Recipe;
use crate::transport::Transport;

pub const CATALOG_SERVICE: &str = "recipe catalog";

/// Grams below the protein target still accepted by a search.
pub const PROTEIN_RELAXATION: u32 = 5;

/// Recipe search against a Spoonacular-style `complexSearch` endpoint.
#[derive(Clone)]
pub struct RecipeCatalogClient {
    transport: Arc<dyn Transport>,
    url: String,
    api_key: String,
}

impl RecipeCatalogClient {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn query_params(
        &self,
        min_calories: u32,
        max_calories: u32,
        min_protein: u32,
        meal_types: &[String],
        page_size: u32,
    ) -> Vec<(String, String)> {
        vec![
            ("number".to_string(), page_size.to_string()),
            ("minCalories".to_string(), min_calories.to_string()),
            ("maxCalories".to_string(), max_calories.to_string()),
            (
                "minProtein".to_string(),
                min_protein.saturating_sub(PROTEIN_RELAXATION).to_string(),
            ),
            ("type".to_string(), meal_types.join(",")),
            ("addRecipeNutrition".to_string(), "true".to_string()),
            ("apiKey".to_string(), self.api_key.clone()),
        ]
    }

    /// Search for recipes inside a calorie window with at least `min_protein`
    /// grams of protein (relaxed by [`PROTEIN_RELAXATION`]).
    ///
    /// No matches is an empty vec, not an error.
    pub async fn search(
        &self,
        min_calories: u32,
        max_calories: u32,
        min_protein: u32,
        meal_types: &[String],
        page_size: u32,
    ) -> Result<Vec<Recipe>> {
        let params = self.query_params(min_calories, max_calories, min_protein, meal_types, page_size);
        let body = self.transport.get(CATALOG_SERVICE, &self.url, &params).await?;
        let recipes = parse_search_response(&body)?;
        debug!(
            min_calories,
            max_calories,
            min_protein,
            types = %meal_types.join(","),
            found = recipes.len(),
            "recipe search"
        );
        Ok(recipes)
    }
}

/// Parse a search response body into recipes, dropping unusable entries.
pub fn parse_search_response(body: &str) -> Result<Vec<Recipe>> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| DietError::Parse(format!("recipe search returned invalid JSON: {e}")))?;

    let results = data
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DietError::Parse("recipe search response has no results array".into()))?;

    let mut recipes = Vec::with_capacity(results.len());
    for (idx, result) in results.iter().enumerate() {
        match parse_recipe(result) {
            Some(recipe) => recipes.push(recipe),
            None => warn!(index = idx, "skipping recipe without id or title"),
        }
    }
    Ok(recipes)
}

fn parse_recipe(doc: &Value) -> Option<Recipe> {
    let id = doc.get("id").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
    })?;
    let title = doc
        .get("title")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())?
        .to_string();

    let url = ["sourceUrl", "spoonacularSourceUrl"]
        .iter()
        .find_map(|key| doc.get(*key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
        .map(String::from);

    Some(Recipe {
        id,
        title,
        calories: nutrient_amount(doc, "calories"),
        protein: nutrient_amount(doc, "protein"),
        url,
    })
}

/// Amount of a named nutrient from `nutrition.nutrients`, or 0 when absent.
fn nutrient_amount(doc: &Value, name: &str) -> f64 {
    doc.get("nutrition")
        .and_then(|n| n.get("nutrients"))
        .and_then(|v| v.as_array())
        .and_then(|nutrients| {
            nutrients.iter().find(|n| {
                n.get("name")
                    .and_then(|v| v.as_str())
                    .is_some_and(|s| s.eq_ignore_ascii_case(name))
            })
        })
        .and_then(|n| n.get("amount"))
        .and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
        .unwrap_or(0.0)
}

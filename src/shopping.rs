use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{DietError, Result};
use crate::models::{DayPlan, ShoppingItem, WeeklyPlan, WrittenPlan};
use crate::transport::Transport;

pub const COMPLETIONS_SERVICE: &str = "text generation";

const SHOPPING_LIST_MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// Free-text completion for a single prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible `chat/completions` client.
#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    transport: Arc<dyn Transport>,
    url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsGenerator {
    pub fn new(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": TEMPERATURE
        });
        let raw = self
            .transport
            .post_json(COMPLETIONS_SERVICE, &self.url, Some(&self.api_key), &body)
            .await?;

        let resp: ChatCompletionResponse = serde_json::from_str(&raw)
            .map_err(|e| DietError::Parse(format!("invalid completion response: {e}")))?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| DietError::Parse("completion response has no content".into()))
    }
}

/// A plan that can be handed to the shopping-list prompt as a CSV table.
pub trait PlanSummary {
    fn summary_csv(&self) -> Result<String>;
}

/// Placeholder cells are left out; there is nothing to buy for them.
impl PlanSummary for WeeklyPlan {
    fn summary_csv(&self) -> Result<String> {
        let filled = WeeklyPlan {
            days: self
                .days
                .iter()
                .map(|day| DayPlan {
                    label: day.label.clone(),
                    meals: day
                        .meals
                        .iter()
                        .filter(|m| !m.meal.is_placeholder())
                        .cloned()
                        .collect(),
                })
                .collect(),
        };
        filled.to_csv()
    }
}

impl PlanSummary for WrittenPlan {
    fn summary_csv(&self) -> Result<String> {
        self.to_csv()
    }
}

/// Turns a weekly plan into a consolidated shopping list.
#[derive(Clone)]
pub struct ShoppingListComposer {
    generator: Arc<dyn TextGenerator>,
}

impl ShoppingListComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn compose<P: PlanSummary + ?Sized>(&self, plan: &P) -> Result<Vec<ShoppingItem>> {
        let prompt = shopping_list_prompt(&plan.summary_csv()?);
        let reply = self
            .generator
            .complete(&prompt, SHOPPING_LIST_MAX_TOKENS)
            .await?;
        let items = parse_shopping_list(&reply)?;
        debug!(items = items.len(), "composed shopping list");
        Ok(items)
    }
}

pub fn shopping_list_prompt(summary: &str) -> String {
    format!(
        "Based on the following weekly diet plan, generate a shopping list. \
         Format the shopping list as 'Item, Quantity' in CSV format. \
         Only include the csv, without code fences.\n\
         Here is the plan:\n{summary}"
    )
}

pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the opening fence line, including any language tag.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse an `Item, Quantity` CSV reply. The first `Item` header row is dropped
/// wherever it appears, as are rows with fewer than two fields; extra fields
/// are folded into the quantity.
pub fn parse_shopping_list(text: &str) -> Result<Vec<ShoppingItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(strip_code_fence(text).as_bytes());

    let mut items = Vec::new();
    let mut header_seen = false;
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| DietError::Parse(format!("bad shopping list row: {e}")))?;
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();

        if fields.len() < 2 {
            if !fields.is_empty() {
                warn!(row = idx, "skipping shopping list row without a quantity");
            }
            continue;
        }
        if !header_seen && fields[0].eq_ignore_ascii_case("item") {
            header_seen = true;
            continue;
        }

        items.push(ShoppingItem {
            item: fields[0].to_string(),
            quantity: fields[1..].join(", "),
        });
    }
    Ok(items)
}

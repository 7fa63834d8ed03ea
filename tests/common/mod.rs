#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dietcraft::brackets::CALCULATOR_SERVICE;
use dietcraft::catalog::CATALOG_SERVICE;
use dietcraft::models::{ActivityLevel, Goal, Height, Profile, Sex};
use dietcraft::transport::Transport;
use dietcraft::{DietCraftConfig, DietError};
use serde_json::{json, Value};

pub fn profile(current: f64, desired: f64, weeks: u32, goal: Goal) -> Profile {
    Profile {
        age: 25,
        sex: Sex::Male,
        height: Height { feet: 5, inches: 10 },
        current_weight: current,
        desired_weight: desired,
        time_frame_weeks: weeks,
        activity_level: ActivityLevel::Moderate,
        goal,
    }
}

pub fn test_config(base_url: &str) -> DietCraftConfig {
    DietCraftConfig {
        calculator_url: format!("{base_url}/calorie-calculator.html"),
        catalog_url: format!("{base_url}/recipes/complexSearch"),
        catalog_api_key: "test-catalog-key".to_string(),
        completions_url: format!("{base_url}/v1/chat/completions"),
        completions_api_key: Some("test-openai-key".to_string()),
        request_timeout_secs: 5,
        ..DietCraftConfig::default()
    }
}

fn bracket_row(label: &str, change: Option<&str>, calories: &str) -> String {
    let change = change
        .map(|c| format!(r#"<div style="color:#888;">{c}</div>"#))
        .unwrap_or_default();
    format!(
        r#"<tr><td><div class="bigtext">{label}</div>{change}</td><td><div class="verybigtext"><b>{calories}</b> <span style="font-size:16px;">Calories/day</span></div><div>100%</div></td></tr>"#
    )
}

pub type RowSpec<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn calculator_page(loss: &[RowSpec], gain: &[RowSpec]) -> String {
    let render = |rows: &[RowSpec]| {
        rows.iter()
            .map(|(l, c, k)| bracket_row(l, *c, k))
            .collect::<String>()
    };
    format!(
        r#"<!DOCTYPE html><html><body>
        <form><table id="calinputtable"><tr><td>Age</td><td><input type="text" name="cage" value="25"></td></tr></table></form>
        <h2 class="h2result">Result</h2>
        <table class="cinfoT" width="500">{}</table>
        <p>For gaining weight:</p>
        <table class="cinfoT" width="500">{}</table>
        </body></html>"#,
        render(loss),
        render(gain)
    )
}

/// A calculator.net-shaped result page.
pub fn standard_calculator_page() -> String {
    calculator_page(
        &[
            ("Maintain weight", None, "2,639"),
            ("Mild weight loss", Some("0.5 lb/week"), "2,389"),
            ("Weight loss", Some("1 lb/week"), "2,139"),
            ("Extreme weight loss", Some("2 lb/week"), "1,639"),
        ],
        &[
            ("Mild weight gain", Some("0.5 lb/week"), "2,889"),
            ("Weight gain", Some("1 lb/week"), "3,139"),
            ("Fast Weight gain", Some("2 lb/week"), "3,639"),
        ],
    )
}

pub fn recipe_json(id: u64, calories: f64, protein: f64) -> Value {
    json!({
        "id": id,
        "title": format!("Recipe {id}"),
        "image": format!("https://img.example.com/{id}.jpg"),
        "sourceUrl": format!("https://recipes.example.com/{id}"),
        "nutrition": {
            "nutrients": [
                {"name": "Calories", "amount": calories, "unit": "kcal"},
                {"name": "Fat", "amount": 14.2, "unit": "g"},
                {"name": "Protein", "amount": protein, "unit": "g"}
            ]
        }
    })
}

pub fn search_results(ids: impl IntoIterator<Item = u64>) -> Value {
    let results: Vec<Value> = ids
        .into_iter()
        .map(|id| recipe_json(id, 600.0, 35.0))
        .collect();
    json!({
        "offset": 0,
        "number": results.len(),
        "totalResults": results.len(),
        "results": results
    })
}

pub enum Reply {
    Body(String),
    Down(&'static str),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub service: String,
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory transport answering by service name and recording every call.
pub struct FakeTransport {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, service: &'static str, reply: Reply) -> Self {
        self.replies.insert(service, reply);
        self
    }

    pub fn with_calculator(self, page: String) -> Self {
        self.reply(CALCULATOR_SERVICE, Reply::Body(page))
    }

    pub fn with_catalog(self, body: Value) -> Self {
        self.reply(CATALOG_SERVICE, Reply::Body(body.to_string()))
    }

    pub fn calls_to(&self, service: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.service == service)
            .cloned()
            .collect()
    }

    fn answer(&self, service: &str, url: &str, query: &[(String, String)]) -> dietcraft::Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            service: service.to_string(),
            url: url.to_string(),
            query: query.to_vec(),
        });
        match self.replies.get(service) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Down(reason)) => Err(DietError::upstream(service, *reason)),
            None => Err(DietError::upstream(service, "no fake reply configured")),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, service: &str, url: &str, query: &[(String, String)]) -> dietcraft::Result<String> {
        self.answer(service, url, query)
    }

    async fn post_json(
        &self,
        service: &str,
        url: &str,
        _bearer: Option<&str>,
        _body: &Value,
    ) -> dietcraft::Result<String> {
        self.answer(service, url, &[])
    }
}

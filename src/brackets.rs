use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{DietError, Result};
use crate::models::{ActivityLevel, BracketTables, CalorieBracketRow, Profile};
use crate::transport::Transport;

pub const CALCULATOR_SERVICE: &str = "calorie calculator";

/// Fixed form values the calculator expects alongside the profile fields.
const FIXED_PARAMS: &[(&str, &str)] = &[
    ("cheightmeter", "180"),
    ("ckg", "65"),
    ("cmop", "0"),
    ("coutunit", "c"),
    ("cformula", "m"),
    ("cfatpct", "20"),
    ("printit", "0"),
    ("ctype", "standard"),
    ("x", "Calculate"),
];

/// Activity multiplier as the calculator's `cactivity` field.
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.465,
        ActivityLevel::Active => 1.55,
    }
}

/// Pulls the weight-loss and weight-gain bracket tables for a profile.
#[derive(Clone)]
pub struct RateTableFetcher {
    transport: Arc<dyn Transport>,
    url: String,
}

impl RateTableFetcher {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    pub fn query_params(profile: &Profile) -> Vec<(String, String)> {
        let mut params = vec![
            ("cage".to_string(), profile.age.to_string()),
            ("csex".to_string(), profile.sex.code().to_string()),
            ("cheightfeet".to_string(), profile.height.feet.to_string()),
            ("cheightinch".to_string(), profile.height.inches.to_string()),
            ("cpound".to_string(), profile.current_weight.to_string()),
            (
                "cactivity".to_string(),
                activity_multiplier(profile.activity_level).to_string(),
            ),
        ];
        params.extend(
            FIXED_PARAMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        params
    }

    pub async fn fetch(&self, profile: &Profile) -> Result<BracketTables> {
        let params = Self::query_params(profile);
        let markup = self
            .transport
            .get(CALCULATOR_SERVICE, &self.url, &params)
            .await?;
        let tables = parse_bracket_tables(&markup)?;
        debug!(
            loss_rows = tables.loss.len(),
            gain_rows = tables.gain.len(),
            "parsed bracket tables"
        );
        Ok(tables)
    }
}

fn pattern(cell: &'static OnceLock<Option<Regex>>, src: &str) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(src).ok())
        .as_ref()
        .ok_or_else(|| DietError::Parse(format!("invalid markup pattern {src}")))
}

fn table_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(&RE, r"(?is)<table\b[^>]*>(.*?)</table>")
}

fn row_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(&RE, r"(?is)<tr\b[^>]*>(.*?)</tr>")
}

fn label_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(
        &RE,
        r#"(?is)<div[^>]*\bclass\s*=\s*["']bigtext["'][^>]*>(.*?)</div>"#,
    )
}

fn calories_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(
        &RE,
        r#"(?is)<div[^>]*\bclass\s*=\s*["']verybigtext["'][^>]*>.*?<b>(.*?)</b>"#,
    )
}

fn weekly_change_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(
        &RE,
        r#"(?is)<div[^>]*\bstyle\s*=\s*["']color:\s*#888;?["'][^>]*>(.*?)</div>"#,
    )
}

fn tag_re() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(&RE, r"<[^>]+>")
}

/// Visible text of an HTML fragment with whitespace collapsed.
fn text_content(fragment: &str) -> Result<String> {
    let stripped = tag_re()?.replace_all(fragment, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    Ok(decoded.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn parse_calories(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    digits.parse().ok()
}

/// Extract the loss and gain bracket tables from calculator markup.
///
/// Bracket tables are the `<table>`s holding a `verybigtext` calorie cell, in
/// document order: loss first, gain second. Rows missing a label or a numeric
/// calorie value are skipped.
pub fn parse_bracket_tables(markup: &str) -> Result<BracketTables> {
    let calories = calories_re()?;
    let bodies: Vec<&str> = table_re()?
        .captures_iter(markup)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|body| calories.is_match(body))
        .collect();

    if bodies.len() < 2 {
        return Err(DietError::Parse(format!(
            "expected loss and gain bracket tables, found {}",
            bodies.len()
        )));
    }

    Ok(BracketTables {
        loss: parse_rows(bodies[0], "loss")?,
        gain: parse_rows(bodies[1], "gain")?,
    })
}

fn parse_rows(table: &str, kind: &str) -> Result<Vec<CalorieBracketRow>> {
    let label_re = label_re()?;
    let calories_re = calories_re()?;
    let change_re = weekly_change_re()?;

    let mut rows = Vec::new();
    for (idx, cap) in row_re()?.captures_iter(table).enumerate() {
        let Some(row) = cap.get(1).map(|m| m.as_str()) else {
            continue;
        };

        let label = match label_re.captures(row).and_then(|c| c.get(1)) {
            Some(m) => text_content(m.as_str())?,
            None => String::new(),
        };
        let calories_text = match calories_re.captures(row).and_then(|c| c.get(1)) {
            Some(m) => Some(text_content(m.as_str())?),
            None => None,
        };

        if label.is_empty() && calories_text.is_none() {
            debug!(table = kind, row = idx, "skipping row without bracket cells");
            continue;
        }
        if label.is_empty() {
            warn!(table = kind, row = idx, "skipping bracket row without a label");
            continue;
        }
        let Some(calories_per_day) = calories_text.as_deref().and_then(parse_calories) else {
            warn!(
                table = kind,
                row = idx,
                label = %label,
                calories = ?calories_text,
                "skipping bracket row without numeric calories"
            );
            continue;
        };

        let weekly_change = match change_re.captures(row).and_then(|c| c.get(1)) {
            Some(m) => Some(text_content(m.as_str())?).filter(|s| !s.is_empty()),
            None => None,
        };

        rows.push(CalorieBracketRow {
            label,
            weekly_change,
            calories_per_day,
        });
    }

    Ok(rows)
}

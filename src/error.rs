use thiserror::Error;

/// Failures surfaced by the requirement and planning pipeline.
///
/// An unsafe rate of change and an unfillable plan cell are ordinary values
/// (`CalorieTarget::NotSuggested`, `PlannedMeal::no_recipe_found`), not errors.
#[derive(Error, Debug)]
pub enum DietError {
    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: String, reason: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DietError {
    pub fn upstream(service: &str, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, DietError>;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brackets::RateTableFetcher;
use crate::catalog::RecipeCatalogClient;
use crate::config::DietCraftConfig;
use crate::error::{DietError, Result};
use crate::menu::PlanWriter;
use crate::models::*;
use crate::planner::WeeklyPlanAssembler;
use crate::requirements::{maintenance_calories, RequirementCalculator};
use crate::shopping::{ChatCompletionsGenerator, PlanSummary, ShoppingListComposer, TextGenerator};
use crate::transport::{ReqwestTransport, Transport};

/// A plan together with the targets it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWeek {
    pub requirements: RequirementResult,
    /// Calories the plan was budgeted against
    pub planned_calories: u32,
    pub plan: WeeklyPlan,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    Planned(PlannedWeek),
    /// The profile asks for an unsafe rate of change; nothing was planned.
    NotSuggested { requirements: RequirementResult },
}

/// Profile-to-plan pipeline wired from a single configuration.
#[derive(Clone)]
pub struct DietCraftClient {
    config: DietCraftConfig,
    transport: Arc<dyn Transport>,
    fetcher: RateTableFetcher,
    calculator: RequirementCalculator,
    assembler: WeeklyPlanAssembler,
}

impl DietCraftClient {
    pub fn new(config: DietCraftConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build on a caller-supplied transport, e.g. a fake in tests.
    pub fn with_transport(config: DietCraftConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let fetcher = RateTableFetcher::new(transport.clone(), config.calculator_url.clone());
        let calculator = RequirementCalculator::new(config.protein);
        let catalog = RecipeCatalogClient::new(
            transport.clone(),
            config.catalog_url.clone(),
            config.catalog_api_key.clone(),
        );
        let assembler = WeeklyPlanAssembler::new(catalog, config.plan.clone())?;
        Ok(Self {
            config,
            transport,
            fetcher,
            calculator,
            assembler,
        })
    }

    pub fn config(&self) -> &DietCraftConfig {
        &self.config
    }

    /// Daily calorie and protein targets for a profile.
    pub async fn requirements(&self, profile: &Profile) -> Result<RequirementResult> {
        self.evaluate(profile).await.map(|(result, _)| result)
    }

    async fn evaluate(&self, profile: &Profile) -> Result<(RequirementResult, BracketTables)> {
        profile.validate()?;
        let tables = self.fetcher.fetch(profile).await?;
        let result = self.calculator.evaluate(profile, &tables)?;
        info!(
            calories = %result.daily_calories,
            protein = result.daily_protein,
            goal = %profile.goal,
            "computed requirements"
        );
        Ok((result, tables))
    }

    /// Requirements plus a week of meals.
    ///
    /// A maintaining target is planned at the calculator's maintenance intake.
    pub async fn weekly_plan(&self, profile: &Profile) -> Result<PlanOutcome> {
        let (requirements, tables) = self.evaluate(profile).await?;

        let planned_calories = match requirements.daily_calories {
            CalorieTarget::Calories(c) => c,
            CalorieTarget::Maintaining => maintenance_calories(&tables)?,
            CalorieTarget::NotSuggested => {
                return Ok(PlanOutcome::NotSuggested { requirements });
            }
        };

        let plan = self
            .assembler
            .assemble(planned_calories, requirements.daily_protein, profile.goal)
            .await?;

        Ok(PlanOutcome::Planned(PlannedWeek {
            requirements,
            planned_calories,
            plan,
            generated_at: Utc::now(),
        }))
    }

    /// A week written by the text generator straight from daily targets.
    pub async fn written_plan(&self, daily_calories: u32, daily_protein: u32) -> Result<WrittenPlan> {
        if daily_calories == 0 {
            return Err(DietError::InvalidInput(
                "daily calorie target must be positive".into(),
            ));
        }
        let writer = PlanWriter::new(self.text_generator()?);
        let plan = writer.write_week(daily_calories, daily_protein).await?;
        info!(
            daily_calories,
            daily_protein,
            meals = plan.meals.len(),
            "wrote weekly plan"
        );
        Ok(plan)
    }

    /// Shopping list for either a catalog plan or a written one.
    pub async fn shopping_list<P: PlanSummary + ?Sized>(&self, plan: &P) -> Result<Vec<ShoppingItem>> {
        ShoppingListComposer::new(self.text_generator()?)
            .compose(plan)
            .await
    }

    fn text_generator(&self) -> Result<Arc<dyn TextGenerator>> {
        let api_key = self.config.completions_api_key.clone().ok_or_else(|| {
            DietError::Config("OPENAI_API_KEY is required for generated plans and shopping lists".into())
        })?;
        Ok(Arc::new(ChatCompletionsGenerator::new(
            self.transport.clone(),
            self.config.completions_url.clone(),
            self.config.completions_model.clone(),
            api_key,
        )))
    }
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use dietcraft::models::{ActivityLevel, Goal, Height, Profile, Sex, ShoppingItem};
use dietcraft::{logging, DietCraftClient, DietCraftConfig, PlanOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "dietcraft",
    version,
    about = "Daily nutrition targets and a weekly meal plan from a body profile"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print daily calorie and protein targets
    Requirements {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Build a seven-day meal plan from a profile, or have one written
    /// for given daily targets
    Plan {
        #[command(flatten)]
        profile: Option<ProfileArgs>,
        /// Daily calorie target; skips the profile and writes the plan with
        /// the text generator (needs OPENAI_API_KEY)
        #[arg(long, requires = "protein", conflicts_with = "ProfileArgs")]
        calories: Option<u32>,
        /// Daily protein target in grams, used with --calories
        #[arg(long, requires = "calories")]
        protein: Option<u32>,
        /// Print the plan as CSV instead of JSON
        #[arg(long)]
        csv: bool,
        /// Also print a shopping list (needs OPENAI_API_KEY)
        #[arg(long)]
        shopping_list: bool,
    },
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    age: u32,
    /// male or female
    #[arg(long)]
    sex: Sex,
    #[arg(long)]
    feet: u32,
    #[arg(long, default_value_t = 0)]
    inches: u32,
    /// Current weight (lbs)
    #[arg(long)]
    weight: f64,
    /// Desired weight (lbs)
    #[arg(long)]
    desired: f64,
    /// Weeks to reach the desired weight
    #[arg(long)]
    weeks: u32,
    /// sedentary, light, moderate or active
    #[arg(long)]
    activity: ActivityLevel,
    /// gain, maintain or lose
    #[arg(long)]
    goal: Goal,
}

impl From<ProfileArgs> for Profile {
    fn from(args: ProfileArgs) -> Self {
        Profile {
            age: args.age,
            sex: args.sex,
            height: Height {
                feet: args.feet,
                inches: args.inches,
            },
            current_weight: args.weight,
            desired_weight: args.desired,
            time_frame_weeks: args.weeks,
            activity_level: args.activity,
            goal: args.goal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let config = DietCraftConfig::from_env().context("failed to load configuration")?;
    let client = DietCraftClient::new(config)?;

    run(&client, cli.command).await
}

async fn run(client: &DietCraftClient, command: Commands) -> Result<()> {
    match command {
        Commands::Requirements { profile } => {
            let result = client.requirements(&profile.into()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Plan {
            calories: Some(calories),
            protein,
            csv,
            shopping_list,
            ..
        } => {
            let plan = client
                .written_plan(calories, protein.unwrap_or_default())
                .await
                .context("failed to write weekly plan")?;

            if csv {
                print!("{}", plan.to_csv()?);
            } else {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }

            if shopping_list {
                print_shopping_list(client.shopping_list(&plan).await)?;
            }
        }
        Commands::Plan {
            profile: Some(profile),
            csv,
            shopping_list,
            ..
        } => {
            let week = match client.weekly_plan(&profile.into()).await? {
                PlanOutcome::Planned(week) => week,
                outcome @ PlanOutcome::NotSuggested { .. } => {
                    warn!("requested rate of change is not suggested; no plan built");
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    return Ok(());
                }
            };

            if csv {
                print!("{}", week.plan.to_csv()?);
            } else {
                println!("{}", serde_json::to_string_pretty(&week)?);
            }

            if shopping_list {
                print_shopping_list(client.shopping_list(&week.plan).await)?;
            }
        }
        Commands::Plan { .. } => {
            anyhow::bail!("plan needs either profile flags or --calories and --protein");
        }
    }
    Ok(())
}

fn print_shopping_list(items: dietcraft::Result<Vec<ShoppingItem>>) -> Result<()> {
    let items = items.context("failed to compose shopping list")?;
    println!();
    for item in items {
        println!("{}, {}", item.item, item.quantity);
    }
    Ok(())
}

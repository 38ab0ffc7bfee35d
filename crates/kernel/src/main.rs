//! Care-home filter CLI.
//!
//! Usage:
//!   carehome sql game-session '{"gameId": "...", "relativeToAverage": "ABOVE_AVERAGE"}'
//!   carehome query resident '{"minAge": 80}' --count

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use carehome_kernel::config::Config;
use carehome_kernel::db;
use carehome_kernel::filter::{
    Clock, FilterService, FilterSpec, FixedClock, PgExecutor, PredicateBuilder, SystemClock,
};

/// Build and run entity filters.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SQL generated for a filter.
    Sql(FilterArgs),
    /// Run a filter against DATABASE_URL and print the matching ids.
    Query {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print the number of matches instead of the ids.
        #[arg(long)]
        count: bool,
    },
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Entity kind to filter.
    entity: Entity,

    /// Filter as a camelCase JSON object.
    #[arg(default_value = "{}")]
    filter: String,

    /// Evaluate ages relative to this date instead of today.
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Entity {
    Resident,
    GameSession,
    OutingEvent,
    OutingParticipant,
    StaffUser,
}

impl FilterArgs {
    fn spec(&self) -> Result<FilterSpec> {
        let json = self.filter.as_str();
        Ok(match self.entity {
            Entity::Resident => FilterSpec::Resident(parse(json)?),
            Entity::GameSession => FilterSpec::GameSession(parse(json)?),
            Entity::OutingEvent => FilterSpec::OutingEvent(parse(json)?),
            Entity::OutingParticipant => FilterSpec::OutingParticipant(parse(json)?),
            Entity::StaffUser => FilterSpec::StaffUser(parse(json)?),
        })
    }

    fn builder(&self, config: &Config) -> PredicateBuilder<FixedClock> {
        let today = self.today.unwrap_or_else(|| SystemClock.today());
        PredicateBuilder::with_clock(FixedClock(today)).with_tolerance(config.average_tolerance)
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).context("filter is not valid JSON for this entity")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match args.command {
        Command::Sql(filter) => {
            let query = filter.builder(&config).build(&filter.spec()?);
            let sql = carehome_kernel::filter::to_sql(&query)?;
            println!("{sql}");
        }
        Command::Query { filter, count } => {
            let spec = filter.spec()?;
            let pool = db::connect(&config).await?;

            let service = FilterService::new(
                filter.builder(&config),
                Arc::new(PgExecutor::new(pool)),
            );
            if count {
                println!("{}", service.count(&spec).await?);
            } else {
                for id in service.find(&spec).await? {
                    println!("{id}");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

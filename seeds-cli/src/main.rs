use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use csv::WriterBuilder;
use log::{info, warn};

use seeds::config::{SeedsConfig, DEFAULT_GATEWAY_URL, DEFAULT_WORKERS};
use seeds::registry::{SeedsRegistry, SelectionMode, UserFilter};
use seeds::retry::RetryPolicy;
use seeds::scenario::{builtin_scenario, builtin_scenarios, PlanScenario, SeedsScenario};
use seeds::seeder::Seeder;
use seeds::store::SeedsStore;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the HTTP gateway
    #[clap(long, env = "SEEDS_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway_url: String,
    /// Directory holding the fixture dumps
    #[clap(long, env = "SEEDS_DUMPS_DIR", default_value = "dumps")]
    dumps_dir: PathBuf,
    /// Number of users built concurrently
    #[clap(long, env = "SEEDS_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Attempts per remote call, including the first one
    #[clap(long, env = "SEEDS_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    #[clap(long, env = "SEEDS_RETRY_DELAY_MS", default_value_t = 200)]
    retry_delay_ms: u64,
    /// Timeout of a single remote call, in seconds
    #[clap(long, env = "SEEDS_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a scenario's fixtures and dump them, replacing any previous dump
    Build {
        scenario: String,
        /// JSON plan to build instead of the built-in scenario of that name
        #[clap(long)]
        plan: Option<PathBuf>,
    },
    /// Print one CSV row per dumped user
    Inspect { scenario: String },
    /// Print random dumped users as JSON lines
    Sample {
        scenario: String,
        /// `any` or a slot name such as `credit_card_accounts` or `virtual_cards`
        #[clap(long, default_value = "any")]
        filter: String,
        #[clap(long, default_value_t = 1)]
        count: usize,
        /// Never hand out the same user twice
        #[clap(long)]
        unique: bool,
    },
    /// List the built-in scenarios
    List,
}

impl Cli {
    fn config(&self) -> SeedsConfig {
        SeedsConfig {
            gateway_url: self.gateway_url.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
            workers: self.workers,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_delay: Duration::from_millis(self.retry_delay_ms),
                ..RetryPolicy::default()
            },
            dumps_dir: self.dumps_dir.clone(),
            selection: SelectionMode::default(),
        }
    }
}

fn resolve_scenario(
    name: &str,
    plan: Option<&PathBuf>,
) -> Result<Box<dyn SeedsScenario>, Box<dyn Error>> {
    match plan {
        Some(path) => Ok(Box::new(PlanScenario::from_path(name, path)?)),
        None => builtin_scenario(name).ok_or_else(|| {
            format!("unknown scenario `{name}`, pass --plan to build a custom one").into()
        }),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Cannot listen for Ctrl-C, the build can only be stopped by killing the process");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();

    match &cli.command {
        Command::Build { scenario, plan } => {
            let scenario = resolve_scenario(scenario, plan.as_ref())?;
            let seeder = Seeder::from_config(&config)?;
            let report = seeder
                .build_until(scenario.as_ref(), shutdown_signal())
                .await?;
            info!("Scenario `{}` built: {:?}", scenario.name(), report);
        }
        Command::Inspect { scenario } => {
            let dump = SeedsStore::new(&config.dumps_dir).load(scenario).await?;
            let registry = SeedsRegistry::from_dump(dump, SelectionMode::default());
            let mut writer = WriterBuilder::new().from_writer(io::stdout());
            for summary in registry.summaries() {
                writer.serialize(summary)?;
            }
            writer.flush()?;
        }
        Command::Sample {
            scenario,
            filter,
            count,
            unique,
        } => {
            let filter = UserFilter::from_slot(filter)
                .ok_or_else(|| format!("unknown filter `{filter}`"))?;
            let mode = if *unique {
                SelectionMode::Unique
            } else {
                SelectionMode::WithReplacement
            };
            let dump = SeedsStore::new(&config.dumps_dir).load(scenario).await?;
            let registry = SeedsRegistry::from_dump(dump, mode);
            for _ in 0..*count {
                let user = registry.get_random_user_matching(filter)?;
                println!("{}", serde_json::to_string(user)?);
            }
        }
        Command::List => {
            for scenario in builtin_scenarios() {
                println!("{}", scenario.name());
            }
        }
    }

    Ok(())
}

//! Drives a dumped scenario the way a load test would: the registry is loaded
//! once and handed to every virtual user, which keeps picking random fixtures.
//! can be run with `cargo run --example virtual_users -- existing_user_get_operations`

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, warn};
use rand::Rng;

use seeds::registry::{SeedsRegistry, SelectionMode, UserFilter};
use seeds::store::SeedsStore;

const VIRTUAL_USERS: usize = 50;
const RUN_FOR: Duration = Duration::from_secs(5);

async fn virtual_user(registry: Arc<SeedsRegistry>, filter: UserFilter) -> usize {
    let started = Instant::now();
    let mut iterations = 0;
    while started.elapsed() < RUN_FOR {
        match registry.get_random_user_matching(filter) {
            Ok(user) => {
                // stand-in for the requests a task body would send for `user`
                let accounts = user.all_accounts().count();
                let think = rand::thread_rng().gen_range(1..10) * (accounts as u64 + 1);
                tokio::time::sleep(Duration::from_millis(think)).await;
                iterations += 1;
            }
            Err(e) => {
                error!("Virtual user stopped: {}", e);
                break;
            }
        }
    }
    iterations
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let scenario = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "existing_user_get_operations".to_string());
    let dump = SeedsStore::new("dumps").load(&scenario).await?;
    let registry = Arc::new(SeedsRegistry::from_dump(dump, SelectionMode::WithReplacement));

    let start = Instant::now();
    let handles: Vec<_> = (0..VIRTUAL_USERS)
        .map(|_| tokio::spawn(virtual_user(Arc::clone(&registry), UserFilter::Any)))
        .collect();
    let mut total = 0;
    for handle in handles {
        total += handle.await?;
    }

    warn!(
        "{} virtual users ran {} iterations over {} fixtures in {:.2?}",
        VIRTUAL_USERS,
        total,
        registry.len(),
        start.elapsed()
    );

    Ok(())
}

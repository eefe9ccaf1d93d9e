//! Materializes a [`SeedsPlan`] by driving the [`Gateway`].
//!
//! One job is one user's full sub-tree. Jobs are fed through a bounded queue
//! to a fixed number of workers, and finished users come back through a
//! result channel tagged with their plan index, so the output order never
//! depends on the pool size. Inside a job creation is sequential, which
//! keeps every parent strictly ahead of its children.
//!
//! Failures are absorbed at the smallest enclosing branch: a user that cannot
//! be created is dropped with everything under it, an account likewise, and
//! a failed card or operation only loses itself. The [`BuildReport`] counts
//! what was created and what was dropped.

use std::future::{self, Future};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::config::SeedsConfig;
use crate::error::SeedError;
use crate::gateway::{operation_category, Gateway, OperationRequest, UserProfile};
use crate::plan::{AccountsPlan, OperationKind, SeedsPlan, UsersPlan};
use crate::result::{
    OperationStatus, SeedAccountResult, SeedCardResult, SeedOperationResult, SeedUserResult,
};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildReport {
    pub users_created: u32,
    pub accounts_created: u32,
    pub cards_created: u32,
    pub operations_created: u32,
    pub users_failed: u32,
    pub accounts_failed: u32,
    pub cards_failed: u32,
    pub operations_failed: u32,
}

impl BuildReport {
    fn merge(&mut self, other: &BuildReport) {
        self.users_created += other.users_created;
        self.accounts_created += other.accounts_created;
        self.cards_created += other.cards_created;
        self.operations_created += other.operations_created;
        self.users_failed += other.users_failed;
        self.accounts_failed += other.accounts_failed;
        self.cards_failed += other.cards_failed;
        self.operations_failed += other.operations_failed;
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.users_failed + self.accounts_failed + self.cards_failed + self.operations_failed
    }
}

/// Outcome of a completed build: users in plan order, failed branches omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSeeds {
    pub users: Vec<SeedUserResult>,
    pub report: BuildReport,
}

pub struct Builder {
    gateway: Arc<dyn Gateway>,
    workers: usize,
    retry: RetryPolicy,
    status: OperationStatus,
}

struct BuildContext {
    gateway: Arc<dyn Gateway>,
    plan: UsersPlan,
    retry: RetryPolicy,
    status: OperationStatus,
}

struct UserOutcome {
    user: Option<SeedUserResult>,
    report: BuildReport,
}

impl Builder {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let config = SeedsConfig::default();
        Builder {
            gateway,
            workers: config.workers,
            retry: config.retry,
            status: OperationStatus::default(),
        }
    }

    #[must_use]
    pub fn from_config(gateway: Arc<dyn Gateway>, config: &SeedsConfig) -> Self {
        Builder::new(gateway)
            .with_workers(config.workers)
            .with_retry(config.retry.clone())
    }

    /// Pool size; clamped to at least one worker.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Status every seeded operation is created with.
    #[must_use]
    pub fn with_operation_status(mut self, status: OperationStatus) -> Self {
        self.status = status;
        self
    }

    /// # Errors
    /// Errors when the plan asks for users and none of them could be created.
    pub async fn build(&self, plan: &SeedsPlan) -> Result<BuiltSeeds, SeedError> {
        self.build_until(plan, future::pending()).await
    }

    /// Like [`Builder::build`], but gives up as soon as `shutdown` resolves.
    /// Workers are aborted mid-flight, so entities created up to that point
    /// exist remotely while the partial graph is discarded.
    ///
    /// # Errors
    /// [`SeedError::Cancelled`] when `shutdown` wins, otherwise as [`Builder::build`].
    pub async fn build_until(
        &self,
        plan: &SeedsPlan,
        shutdown: impl Future<Output = ()>,
    ) -> Result<BuiltSeeds, SeedError> {
        let planned = plan.users().count();
        info!(
            "Building {} users ({} remote creations) with {} workers",
            planned,
            plan.total_entities(),
            self.workers
        );

        let ctx = Arc::new(BuildContext {
            gateway: Arc::clone(&self.gateway),
            plan: plan.users().clone(),
            retry: self.retry.clone(),
            status: self.status,
        });
        let (job_tx, job_rx) = mpsc::channel::<u32>(self.workers);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<(u32, UserOutcome)>(self.workers);

        let mut tasks = JoinSet::new();
        for _ in 0..self.workers {
            let ctx = Arc::clone(&ctx);
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            tasks.spawn(async move {
                loop {
                    let job = job_rx.lock().await.recv().await;
                    let Some(index) = job else { break };
                    let outcome = build_user(&ctx, index).await;
                    if result_tx.send((index, outcome)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
        tasks.spawn(async move {
            for index in 0..planned {
                if job_tx.send(index).await.is_err() {
                    break;
                }
            }
        });

        let collect = async {
            let mut slots: Vec<Option<SeedUserResult>> = vec![None; planned as usize];
            let mut report = BuildReport::default();
            while let Some((index, outcome)) = result_rx.recv().await {
                report.merge(&outcome.report);
                slots[index as usize] = outcome.user;
            }
            (slots, report)
        };

        let (slots, report) = tokio::select! {
            collected = collect => collected,
            () = shutdown => {
                tasks.abort_all();
                warn!("Build cancelled, discarding the partial result");
                return Err(SeedError::Cancelled(format!("{planned} users")));
            }
        };
        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|e| SeedError::Worker(e.to_string()))?;
        }

        info!("Build finished: {:?}", report);
        if planned > 0 && report.users_created == 0 {
            error!("No user could be created, aborting the build");
            return Err(SeedError::NoUsersCreated { planned });
        }
        Ok(BuiltSeeds {
            users: slots.into_iter().flatten().collect(),
            report,
        })
    }
}

async fn build_user(ctx: &BuildContext, index: u32) -> UserOutcome {
    let mut report = BuildReport::default();
    let profile = UserProfile::random();
    let user_id = match ctx
        .retry
        .execute(&format!("create user #{index}"), || {
            ctx.gateway.create_user(&profile)
        })
        .await
    {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Dropping user #{}: {}", index, e);
            report.users_failed += 1;
            return UserOutcome { user: None, report };
        }
    };
    report.users_created += 1;
    debug!("Created user #{} ({})", index, user_id);

    let mut user = SeedUserResult::new(user_id.clone());
    for (kind, accounts_plan) in ctx.plan.accounts() {
        for n in 0..accounts_plan.count() {
            let branch = format!("{kind}[{n}] of user #{index}");
            match ctx
                .retry
                .execute(&format!("open {branch}"), || {
                    ctx.gateway.open_account(&user_id, kind)
                })
                .await
            {
                Ok(account_id) => {
                    report.accounts_created += 1;
                    let account =
                        build_account(ctx, &user_id, account_id, accounts_plan, &branch, &mut report)
                            .await;
                    user.accounts_mut(kind).push(account);
                }
                Err(e) => {
                    warn!("Dropping {}: {}", branch, e);
                    report.accounts_failed += 1;
                }
            }
        }
    }
    UserOutcome {
        user: Some(user),
        report,
    }
}

async fn build_account(
    ctx: &BuildContext,
    user_id: &str,
    account_id: String,
    plan: &AccountsPlan,
    branch: &str,
    report: &mut BuildReport,
) -> SeedAccountResult {
    let mut account = SeedAccountResult::new(account_id);

    for (kind, count) in plan.cards() {
        for n in 0..count {
            match ctx
                .retry
                .execute(&format!("issue {kind}[{n}] on {branch}"), || {
                    ctx.gateway.issue_card(user_id, &account.account_id, kind)
                })
                .await
            {
                Ok(card_id) => {
                    report.cards_created += 1;
                    account.cards_mut(kind).push(SeedCardResult { card_id });
                }
                Err(e) => {
                    warn!("Dropping {}[{}] on {}: {}", kind, n, branch, e);
                    report.cards_failed += 1;
                }
            }
        }
    }

    for (kind, count) in plan.operations() {
        for n in 0..count {
            let request = OperationRequest {
                kind,
                status: ctx.status,
                amount: random_amount(kind),
                card_id: pick_card(&account),
                account_id: account.account_id.clone(),
                category: operation_category(kind),
            };
            match ctx
                .retry
                .execute(&format!("make {kind}[{n}] on {branch}"), || {
                    ctx.gateway.make_operation(&request)
                })
                .await
            {
                Ok(operation_id) => {
                    report.operations_created += 1;
                    account.operations_mut(kind).push(SeedOperationResult {
                        operation_id,
                        card_id: request.card_id,
                        amount: request.amount,
                        status: request.status,
                    });
                }
                Err(e) => {
                    warn!("Dropping {}[{}] on {}: {}", kind, n, branch, e);
                    report.operations_failed += 1;
                }
            }
        }
    }
    account
}

/// One of the account's own cards, or a made-up id when none was issued.
fn pick_card(account: &SeedAccountResult) -> String {
    let cards: Vec<&SeedCardResult> = account.all_cards().collect();
    cards.choose(&mut rand::thread_rng()).map_or_else(
        || uuid::Uuid::new_v4().to_string(),
        |card| card.card_id.clone(),
    )
}

/// Amount in minor units, drawn from a range typical for the kind.
fn random_amount(kind: OperationKind) -> Decimal {
    let (low, high) = match kind {
        OperationKind::Purchase => (100, 50_000),
        OperationKind::TopUp => (1_000, 100_000),
        OperationKind::Cashback => (10, 5_000),
        OperationKind::Transfer => (500, 50_000),
        OperationKind::BillPayment => (500, 30_000),
        OperationKind::CashWithdrawal => (1_000, 20_000),
        OperationKind::Fee => (10, 1_000),
    };
    Decimal::new(rand::thread_rng().gen_range(low..=high), 2)
}

use std::future::{self, Future};
use std::sync::Arc;

use crate::builder::{BuildReport, Builder};
use crate::config::SeedsConfig;
use crate::error::SeedError;
use crate::http::HttpGateway;
use crate::registry::{SelectionMode, SeedsRegistry};
use crate::scenario::SeedsScenario;
use crate::store::{SeedsDump, SeedsStore};

/// Entry point of a load-test bootstrap: builds scenarios into dumps and
/// loads dumps into registries that are then handed to every worker.
pub struct Seeder {
    builder: Builder,
    store: SeedsStore,
    selection: SelectionMode,
}

impl Seeder {
    #[must_use]
    pub fn new(builder: Builder, store: SeedsStore) -> Self {
        Seeder {
            builder,
            store,
            selection: SelectionMode::default(),
        }
    }

    /// Seeder talking to the HTTP gateway described by `config`.
    ///
    /// # Errors
    /// Errors when `config` is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &SeedsConfig) -> Result<Self, SeedError> {
        config.validate()?;
        let gateway = HttpGateway::new(config.gateway_url.clone(), config.request_timeout)?;
        let builder = Builder::from_config(Arc::new(gateway), config);
        Ok(Seeder::new(builder, SeedsStore::new(config.dumps_dir.clone()))
            .with_selection(config.selection))
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SeedsStore {
        &self.store
    }

    /// Builds the scenario's plan and dumps the result under its name,
    /// replacing the previous dump.
    ///
    /// # Errors
    /// Errors on invalid scenario names, root-level build failures and when
    /// the dump cannot be written.
    pub async fn build(&self, scenario: &dyn SeedsScenario) -> Result<BuildReport, SeedError> {
        self.build_until(scenario, future::pending()).await
    }

    /// # Errors
    /// As [`Seeder::build`]; additionally [`SeedError::Cancelled`] when
    /// `shutdown` resolves first, in which case nothing is dumped.
    pub async fn build_until(
        &self,
        scenario: &dyn SeedsScenario,
        shutdown: impl Future<Output = ()>,
    ) -> Result<BuildReport, SeedError> {
        let name = scenario.name();
        self.store.path_for(name)?;
        let built = self
            .builder
            .build_until(&scenario.plan(), shutdown)
            .await
            .map_err(|e| match e {
                SeedError::Cancelled(_) => SeedError::Cancelled(name.to_string()),
                e => e,
            })?;
        let dump = SeedsDump::new(name, built.users, built.report);
        self.store.dump(&dump).await?;
        Ok(built.report)
    }

    /// # Errors
    /// [`SeedError::FixtureNotFound`] when the scenario was never built.
    pub async fn load(&self, scenario: &str) -> Result<SeedsRegistry, SeedError> {
        let dump = self.store.load(scenario).await?;
        Ok(SeedsRegistry::from_dump(dump, self.selection))
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::registry::UserFilter;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("I/O Error")]
    IoError(#[from] io::Error),
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid plan: negative count at `{path}`")]
    NegativeCount { path: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Gateway Error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Invalid scenario name `{0}`")]
    InvalidScenarioName(String),
    #[error("No fixture dump for scenario `{scenario}` at {}, run the build first", .path.display())]
    FixtureNotFound { scenario: String, path: PathBuf },
    #[error("Fixture dump version {found} is newer than the supported version {supported}")]
    UnsupportedDumpVersion { found: u32, supported: u32 },
    #[error("No fixture matches {0}")]
    NoMatchingFixture(UserFilter),
    #[error("Every fixture matching {0} has already been handed out")]
    FixturePoolExhausted(UserFilter),
    #[error("None of the {planned} planned users could be created")]
    NoUsersCreated { planned: u32 },
    #[error("Build for scenario `{0}` was cancelled before completion")]
    Cancelled(String),
    #[error("Build worker failed: {0}")]
    Worker(String),
}

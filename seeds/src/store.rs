use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::builder::BuildReport;
use crate::error::SeedError;
use crate::result::SeedUserResult;

/// Highest dump envelope version this build reads and the one it writes.
pub const DUMP_VERSION: u32 = 1;

/// Persisted snapshot of a completed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedsDump {
    pub version: u32,
    pub scenario: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub report: BuildReport,
    pub users: Vec<SeedUserResult>,
}

impl SeedsDump {
    #[must_use]
    pub fn new(scenario: impl Into<String>, users: Vec<SeedUserResult>, report: BuildReport) -> Self {
        SeedsDump {
            version: DUMP_VERSION,
            scenario: scenario.into(),
            created_at: Utc::now(),
            report,
            users,
        }
    }
}

/// Directory of dumps, one `<scenario>_seeds.json` file per scenario.
#[derive(Debug, Clone)]
pub struct SeedsStore {
    dir: PathBuf,
}

impl SeedsStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SeedsStore { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// # Errors
    /// Errors when `scenario` is empty or could escape the dumps directory.
    pub fn path_for(&self, scenario: &str) -> Result<PathBuf, SeedError> {
        if scenario.is_empty()
            || scenario.contains(['/', '\\'])
            || scenario.starts_with('.')
        {
            return Err(SeedError::InvalidScenarioName(scenario.to_string()));
        }
        Ok(self.dir.join(format!("{scenario}_seeds.json")))
    }

    /// # Errors
    /// Errors when the scenario name is invalid.
    pub async fn exists(&self, scenario: &str) -> Result<bool, SeedError> {
        Ok(fs::try_exists(self.path_for(scenario)?).await?)
    }

    /// Writes `dump` under its scenario name, replacing any previous dump.
    /// The file is written next to its destination and renamed into place so
    /// readers never observe a half-written dump.
    ///
    /// # Errors
    /// Errors when the directory or the file cannot be written.
    pub async fn dump(&self, dump: &SeedsDump) -> Result<PathBuf, SeedError> {
        let path = self.path_for(&dump.scenario)?;
        fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(dump)?;
        let written = match fs::write(&tmp, bytes).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            match fs::remove_file(&tmp).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    warn!("Cannot remove {}: {}", tmp.display(), cleanup);
                }
                _ => {}
            }
            return Err(e.into());
        }
        info!(
            "Dumped {} users for scenario `{}` to {}",
            dump.users.len(),
            dump.scenario,
            path.display()
        );
        Ok(path)
    }

    /// # Errors
    /// [`SeedError::FixtureNotFound`] when the scenario was never dumped,
    /// [`SeedError::UnsupportedDumpVersion`] for dumps written by a newer
    /// build, decode errors for anything that is not a dump.
    pub async fn load(&self, scenario: &str) -> Result<SeedsDump, SeedError> {
        let path = self.path_for(scenario)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SeedError::FixtureNotFound {
                    scenario: scenario.to_string(),
                    path,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let envelope: VersionProbe = serde_json::from_slice(&bytes)?;
        if envelope.version > DUMP_VERSION {
            return Err(SeedError::UnsupportedDumpVersion {
                found: envelope.version,
                supported: DUMP_VERSION,
            });
        }
        let dump: SeedsDump = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} users for scenario `{}` from {}",
            dump.users.len(),
            scenario,
            path.display()
        );
        Ok(dump)
    }
}

/// Reads only the version so newer layouts fail with a clear error instead
/// of an arbitrary decode error.
#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_path_for() {
        let store = SeedsStore::new("dumps");
        assert_eq!(
            store.path_for("existing_user_get_operations").unwrap(),
            PathBuf::from("dumps/existing_user_get_operations_seeds.json")
        );
        for bad in ["", "../etc", "a/b", "a\\b", ".hidden"] {
            assert!(matches!(
                store.path_for(bad),
                Err(SeedError::InvalidScenarioName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedsStore::new(dir.path());
        assert!(!store.exists("nothing").await.unwrap());
        assert!(matches!(
            store.load("nothing").await,
            Err(SeedError::FixtureNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedsStore::new(dir.path());
        let path = store.path_for("future").unwrap();
        std::fs::write(&path, r#"{ "version": 99, "layout": "unknown" }"#).unwrap();
        assert!(matches!(
            store.load("future").await,
            Err(SeedError::UnsupportedDumpVersion { found: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_dump_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedsStore::new(dir.path().join("nested"));

        let first = SeedsDump::new(
            "scenario",
            vec![SeedUserResult::new("u-1"), SeedUserResult::new("u-2")],
            BuildReport::default(),
        );
        store.dump(&first).await.unwrap();
        let second = SeedsDump::new(
            "scenario",
            vec![SeedUserResult::new("u-3")],
            BuildReport::default(),
        );
        let path = store.dump(&second).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = store.load("scenario").await.unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedsStore::new(dir.path());

        std::fs::write(store.path_for("truncated").unwrap(), r#"{ "version": 1, "sce"#).unwrap();
        assert!(matches!(
            store.load("truncated").await,
            Err(SeedError::JsonError(_))
        ));

        std::fs::write(
            store.path_for("unversioned").unwrap(),
            r#"{ "scenario": "unversioned", "users": [] }"#,
        )
        .unwrap();
        assert!(matches!(
            store.load("unversioned").await,
            Err(SeedError::JsonError(_))
        ));

        std::fs::write(
            store.path_for("foreign").unwrap(),
            r#"{ "version": 1, "rows": [1, 2] }"#,
        )
        .unwrap();
        assert!(matches!(
            store.load("foreign").await,
            Err(SeedError::JsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_dump_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedsStore::new(dir.path());
        let path = store.path_for("blocked").unwrap();
        // a directory in the way makes the rename fail
        std::fs::create_dir_all(path.join("inner")).unwrap();

        let dump = SeedsDump::new("blocked", Vec::new(), BuildReport::default());
        assert!(matches!(
            store.dump(&dump).await,
            Err(SeedError::IoError(_))
        ));
        assert!(!path.with_extension("json.tmp").exists());
    }
}

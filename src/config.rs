use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::dog::{Dog, Roster};
use crate::tracking::{SessionConfig, MAX_GRACE};
use crate::widgets::WidgetKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub dogs: Vec<Dog>,
    /// Metric cards in display order; anything missing is hidden.
    pub widgets: Vec<WidgetKind>,
    pub grace_secs: u64,
    pub save_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dogs: Vec::new(),
            widgets: WidgetKind::ALL.to_vec(),
            grace_secs: 3,
            save_history: true,
        }
    }
}

impl Config {
    pub fn roster(&self) -> Roster {
        Roster::new(self.dogs.clone())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            grace: Duration::from_secs(self.grace_secs).min(MAX_GRACE),
            ..SessionConfig::default()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("trailpaws_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!(
                    "ignoring invalid config {}: {}",
                    self.path.display(),
                    e
                ),
            },
            Err(e) => log::debug!("no config at {}: {}", self.path.display(), e),
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TICK_PERIOD;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            dogs: vec![Dog::new("Rex", "Lab", 80), Dog::new("Pip", "Terrier", 95)],
            widgets: vec![WidgetKind::Distance, WidgetKind::Time],
            grace_secs: 5,
            save_history: false,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
        assert_eq!(loaded.roster().len(), 2);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"dogs":[{"id":"rex","name":"Rex"}]}"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.dogs.len(), 1);
        assert_eq!(loaded.grace_secs, 3);
        assert_eq!(loaded.widgets, WidgetKind::ALL.to_vec());
    }

    #[test]
    fn invalid_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn session_config_uses_configured_grace() {
        let cfg = Config {
            grace_secs: 10,
            ..Config::default()
        };
        let session = cfg.session_config();
        assert_eq!(session.grace, Duration::from_secs(10));
        assert_eq!(session.tick_period, TICK_PERIOD);

        let huge = Config {
            grace_secs: u64::MAX,
            ..Config::default()
        };
        assert_eq!(huge.session_config().grace, MAX_GRACE);
    }

    #[test]
    fn tick_period_in_old_config_files_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"grace_secs":4,"tick_millis":500}"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.grace_secs, 4);
        assert_eq!(loaded.session_config().tick_period, TICK_PERIOD);
    }

    #[test]
    fn save_reports_unwritable_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let store = FileConfigStore::with_path(blocker.join("config.json"));
        assert!(store.save(&Config::default()).is_err());
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use modelmux_catalog::{Connection, ConnectionConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "modelmux";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// One connection as it appears in the settings file. Every field defaults so
/// partially written files still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_provider_kind")]
    pub provider: ProviderKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for ConnectionEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            provider: default_provider_kind(),
            url: String::new(),
            api_key: String::new(),
        }
    }
}

impl ConnectionEntry {
    /// Trims every field; entries without an id are dropped by
    /// normalization.
    fn normalized(mut self) -> Option<Self> {
        self.id = self.id.trim().to_string();
        if self.id.is_empty() {
            return None;
        }

        self.url = self.url.trim().to_string();
        self.api_key = self.api_key.trim().to_string();
        Some(self)
    }

    pub fn to_connection(&self) -> Option<Connection> {
        if self.id.trim().is_empty() {
            return None;
        }

        Some(Connection::new(
            &self.id,
            self.provider,
            ConnectionConfig {
                url: self.url.trim().to_string(),
                api_key: self.api_key.trim().to_string(),
            },
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.connections = self
            .connections
            .into_iter()
            .filter_map(ConnectionEntry::normalized)
            .collect();
        self
    }

    /// The catalog-facing view of these settings.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .filter_map(ConnectionEntry::to_connection)
            .collect()
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".modelmux"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    /// The current connection list, ready for a resolution pass.
    pub fn connections(&self) -> Vec<Connection> {
        self.settings().connections()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> AppSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return AppSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(AppSettings::default())).merge(Json::file(path));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::OpenAi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, provider: ProviderKind, url: &str) -> ConnectionEntry {
        ConnectionEntry {
            id: id.to_string(),
            provider,
            url: url.to_string(),
            api_key: String::new(),
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SettingsStore::new(dir.path().join("settings.json"));

        assert_eq!(*store.settings(), AppSettings::default());
        assert!(store.connections().is_empty());
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ this is not json").expect("write fixture");

        let store = SettingsStore::new(path);
        assert_eq!(*store.settings(), AppSettings::default());
    }

    #[test]
    fn update_persists_and_survives_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");

        let store = SettingsStore::new(path.clone());
        let settings = AppSettings {
            connections: vec![
                entry("conn-oa", ProviderKind::OpenAi, ""),
                entry("conn-ol", ProviderKind::Ollama, "http://localhost:11434"),
            ],
        };
        store.update(settings.clone()).expect("persist settings");

        let reloaded = SettingsStore::new(path);
        assert_eq!(*reloaded.settings(), settings);

        let connections = reloaded.connections();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[1].id, "conn-ol");
        assert_eq!(connections[1].kind, ProviderKind::Ollama);
        assert_eq!(connections[1].config.url, "http://localhost:11434");
    }

    #[test]
    fn normalization_drops_blank_rows_and_trims_fields() {
        let settings = AppSettings {
            connections: vec![
                entry("  ", ProviderKind::OpenAi, ""),
                entry(" conn-ol ", ProviderKind::Ollama, " http://localhost:11434 "),
            ],
        }
        .normalized();

        assert_eq!(settings.connections.len(), 1);
        assert_eq!(settings.connections[0].id, "conn-ol");
        assert_eq!(settings.connections[0].url, "http://localhost:11434");
    }

    #[test]
    fn unknown_provider_tags_survive_load_as_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"connections":[{"id":"conn-x","provider":"mystery-vendor"}]}"#,
        )
        .expect("write fixture");

        let store = SettingsStore::new(path);
        let connections = store.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].kind, ProviderKind::Unknown);
    }
}

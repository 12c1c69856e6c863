use crate::storage::DEFAULT_SLOT_KEY;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    pub storage: Option<StorageConfig>,
    pub admin: Option<bool>,
    pub forms: Option<FormsConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub dir: Option<PathBuf>,
    pub key: Option<String>,
}

/// Values prefilled in the admin forms.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormsConfig {
    #[serde(rename = "videoCategory")]
    pub video_category: Option<String>,
    #[serde(rename = "showCategory")]
    pub show_category: Option<String>,
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Like [`from_file`](Self::from_file), but a missing file means defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            info!("No configuration at {}, using defaults", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.dir.clone())
            .or_else(|| ProjectDirs::from("", "kflix", "kflix").map(|p| p.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(".kflix"))
    }

    pub fn storage_key(&self) -> String {
        self.storage
            .as_ref()
            .and_then(|s| s.key.clone())
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SLOT_KEY.to_string())
    }

    pub fn admin(&self) -> bool {
        self.admin.unwrap_or(false)
    }

    pub fn video_category(&self) -> String {
        self.forms
            .as_ref()
            .and_then(|f| f.video_category.clone())
            .unwrap_or_else(|| "Trending".to_string())
    }

    pub fn show_category(&self) -> String {
        self.forms
            .as_ref()
            .and_then(|f| f.show_category.clone())
            .unwrap_or_else(|| "Featured".to_string())
    }
}

// ============================================================
// APPLICATION CONFIGURATION
// ============================================================
// Layered: built-in defaults -> emailprep.toml -> EMAILPREP_* env vars

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::image_mapping::MatchPolicy;

/// Env var that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "EMAILPREP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "emailprep.toml";
const ENV_PREFIX: &str = "EMAILPREP_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub spreadsheet: SpreadsheetConfig,
    #[validate(nested)]
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Upper bound for a whole multipart upload, both files included.
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Where uploads and generated templates live.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    #[validate(length(min = 1))]
    pub upload_dir: String,
    /// Prepended to the uploaded file name; must not be empty or the output
    /// would overwrite the upload.
    #[validate(length(min = 1))]
    pub output_prefix: String,
    #[validate(length(min = 1))]
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            output_prefix: "modified_".to_string(),
            allowed_extensions: vec!["html".to_string(), "xlsx".to_string()],
        }
    }
}

impl StorageConfig {
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SpreadsheetConfig {
    /// Preferred sheet; the first worksheet is used when it does not exist.
    pub sheet_name: String,
    /// Substring identifying the local file name column header.
    #[validate(length(min = 1))]
    pub local_name_column: String,
    /// Substring identifying the hosted URL column header.
    #[validate(length(min = 1))]
    pub url_column: String,
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            local_name_column: "Local Image Name".to_string(),
            url_column: "Live SFMC URL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TransformConfig {
    pub match_policy: MatchPolicy,
    /// Markup that takes the place of `</html>` in the output.
    #[validate(length(min = 1))]
    pub tracking_tag: String,
    /// A table must carry every one of these classes to be searched for preheader rows.
    #[validate(length(min = 1))]
    pub preheader_classes: Vec<String>,
    #[validate(length(min = 1))]
    pub preheader_token: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::First,
            tracking_tag: r#"<custom name="opencounter" type="tracking"/>"#.to_string(),
            preheader_classes: vec!["main_body".to_string(), "device_width".to_string()],
            preheader_token: "{{customText".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads from `$EMAILPREP_CONFIG`, or `emailprep.toml` in the working directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// A missing file is fine; defaults and env still apply.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: AppConfig = Self::figment(path).extract().map_err(|e| {
            AppError::ConfigError(format!("Failed to load configuration: {}", e))
        })?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))
    }
}

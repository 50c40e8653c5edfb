//! Application configuration for catalogsearch.
//!
//! User config lives at `~/.catalogsearch/catalogsearch.toml`.
//! Values set by the host pipeline override config file values, which
//! override defaults.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogSearchError, Result};
use crate::fields::FieldKeys;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "catalogsearch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".catalogsearch";

/// Highest supported rounding precision for prices.
const MAX_PRICE_PRECISION: u32 = 6;

static FIELDS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Config structs (matching catalogsearch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Index augmentation settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Catalog database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefix prepended to every engine-added field name. Any string without
    /// whitespace.
    #[serde(default)]
    pub fields_prefix: String,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Decimal places kept on minimum prices.
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            price_precision: default_price_precision(),
        }
    }
}

fn default_price_precision() -> u32 {
    2
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the catalog index database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Maximum number of ids bound into a single lookup statement.
    #[serde(default = "default_lookup_chunk_size")]
    pub lookup_chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            lookup_chunk_size: default_lookup_chunk_size(),
        }
    }
}

impl StorageConfig {
    /// Database path with a leading `~/` expanded to the home directory.
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match self.database_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    CatalogSearchError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.database_path)),
        }
    }
}

fn default_database_path() -> String {
    "~/.catalogsearch/catalog.db".into()
}
fn default_lookup_chunk_size() -> usize {
    500
}

// ---------------------------------------------------------------------------
// Index settings (runtime, derived from config)
// ---------------------------------------------------------------------------

/// Runtime augmentation settings, built from the config once and handed to
/// the augmenter at construction.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Prefixed field-name builder.
    pub fields: FieldKeys,
    /// Decimal places kept on minimum prices.
    pub price_precision: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for IndexSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            fields: FieldKeys::new(config.engine.fields_prefix.clone()),
            price_precision: config.index.price_precision,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.catalogsearch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogSearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.catalogsearch/catalogsearch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogSearchError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CatalogSearchError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogSearchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogSearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogSearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings the augmenter cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let prefix = &config.engine.fields_prefix;
    if !FIELDS_PREFIX_RE.is_match(prefix) {
        return Err(CatalogSearchError::config(format!(
            "fields_prefix {prefix:?} must not contain whitespace"
        )));
    }
    if config.storage.lookup_chunk_size == 0 {
        return Err(CatalogSearchError::config(
            "storage.lookup_chunk_size must be greater than zero",
        ));
    }
    if config.index.price_precision > MAX_PRICE_PRECISION {
        return Err(CatalogSearchError::config(format!(
            "index.price_precision {} exceeds the maximum of {MAX_PRICE_PRECISION}",
            config.index.price_precision
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("fields_prefix"));
        assert!(toml_str.contains("lookup_chunk_size"));
    }

    #[test]
    fn config_with_sections() {
        let toml_str = r#"
[engine]
fields_prefix = "attr_"

[storage]
database_path = "/tmp/catalog.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.engine.fields_prefix, "attr_");
        assert_eq!(config.storage.database_path, "/tmp/catalog.db");
        assert_eq!(config.storage.lookup_chunk_size, 500);
        assert_eq!(config.index.price_precision, 2);
        validate_config(&config).expect("valid");
    }

    #[test]
    fn database_path_expands_home() {
        let config = StorageConfig {
            database_path: "/var/lib/catalog.db".into(),
            lookup_chunk_size: 10,
        };
        assert_eq!(
            config.resolved_database_path().expect("absolute path"),
            PathBuf::from("/var/lib/catalog.db")
        );

        if let Some(home) = dirs::home_dir() {
            let resolved = StorageConfig::default()
                .resolved_database_path()
                .expect("home path");
            assert_eq!(resolved, home.join(".catalogsearch/catalog.db"));
        }
    }

    #[test]
    fn index_settings_from_app_config() {
        let mut app = AppConfig::default();
        app.engine.fields_prefix = "es_".into();
        let settings = IndexSettings::from(&app);
        assert_eq!(settings.fields.categories(), "es_categories");
        assert_eq!(settings.price_precision, 2);
    }

    #[test]
    fn rejects_bad_prefix() {
        let mut config = AppConfig::default();
        config.engine.fields_prefix = "bad prefix.".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("fields_prefix"));
    }

    #[test]
    fn accepts_punctuated_prefixes() {
        for prefix in ["", "attr_", "x-", "attr.", "es:v2/"] {
            let mut config = AppConfig::default();
            config.engine.fields_prefix = prefix.into();
            validate_config(&config).expect("prefix without whitespace");
        }

        let mut config = AppConfig::default();
        config.engine.fields_prefix = "tab\tprefix".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_chunk_and_huge_precision() {
        let mut config = AppConfig::default();
        config.storage.lookup_chunk_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.index.price_precision = 9;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn load_from_file_validates() {
        let path = std::env::temp_dir().join(format!("cs_config_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[engine]\nfields_prefix = \"x y\"\n").expect("write");
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}

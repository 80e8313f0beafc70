//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every field has a
//! built-in default, so a missing file is not fatal.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`SNAPCLASS_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SNAPCLASS_ROOT_FOLDER";

/// Environment variable pointing at the TOML config file
pub const CONFIG_FILE_ENV: &str = "SNAPCLASS_CONFIG";

/// File name looked up under the platform config directory
pub const CONFIG_FILE_NAME: &str = "snapclass.toml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Folder holding the model artifact, vocabulary and optional content file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Default: 5790
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for uploaded image bodies
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Input normalization applied before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Per-channel ImageNet mean/std (fastai and torchvision exports)
    #[default]
    Imagenet,
    /// Plain `[0, 1]` scaling
    Unit,
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Direct download URL for the model file
    #[serde(default)]
    pub url: Option<String>,

    /// Google Drive file id, used when `url` is not set
    #[serde(default)]
    pub gdrive_file_id: Option<String>,

    /// Local model path (relative paths resolve against the root folder)
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Vocabulary file, one label per line in class-index order
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,

    #[serde(default = "default_input_size")]
    pub input_width: u32,

    #[serde(default = "default_input_size")]
    pub input_height: u32,

    #[serde(default)]
    pub normalization: Normalization,

    /// Treat model output as logits and apply softmax
    #[serde(default = "default_true")]
    pub apply_softmax: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: None,
            gdrive_file_id: None,
            path: default_model_path(),
            labels_path: default_labels_path(),
            input_width: default_input_size(),
            input_height: default_input_size(),
            normalization: Normalization::default(),
            apply_softmax: true,
        }
    }
}

impl ModelConfig {
    /// Remote location of the model artifact, if one is configured
    ///
    /// A direct `url` wins over `gdrive_file_id`.
    pub fn source_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.trim().to_string());
        }
        self.gdrive_file_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(gdrive_download_url)
    }
}

/// Download URL for a publicly shared Google Drive file
pub fn gdrive_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

/// Content registry source
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// Registry TOML file; the embedded sample registry is used when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Per-browser session bookkeeping
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.onnx")
}

fn default_labels_path() -> PathBuf {
    PathBuf::from("labels.txt")
}

fn default_input_size() -> u32 {
    224
}

fn default_true() -> bool {
    true
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    1024
}

/// Parse a TOML config document
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content)?;
    if config.model.input_width == 0 || config.model.input_height == 0 {
        return Err(Error::Config(
            "model.input_width and model.input_height must be positive".to_string(),
        ));
    }
    Ok(config)
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Locate the config file
///
/// Priority: explicit path → `SNAPCLASS_CONFIG` → `<config dir>/snapclass/snapclass.toml`.
/// An explicit path is returned even if it does not exist, so the caller reports it.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("snapclass").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load the bootstrap config, falling back to defaults when no file exists
///
/// A file that exists but fails to parse is an error; a missing file only warns.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    match find_config_file(explicit) {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        None => {
            warn!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Root folder resolution
///
/// Priority order:
/// 1. Command-line argument
/// 2. `SNAPCLASS_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_value }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("snapclass"))
        .unwrap_or_else(|| PathBuf::from("./snapclass_data"))
}

/// Creates the root folder and resolves paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Absolute paths pass through; relative ones are joined to the root folder
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        resolve_against(&self.root_folder, path)
    }
}

/// Join a relative `path` onto `base`; absolute paths are returned unchanged
///
/// Paths from the config file resolve against the root folder. Paths given on
/// the command line resolve against the working directory.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.port, 5790);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.model.input_width, 224);
        assert_eq!(config.model.normalization, Normalization::Imagenet);
        assert!(config.model.apply_softmax);
        assert!(config.content.path.is_none());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = parse_toml_config(
            r#"
            [server]
            port = 8080

            [model]
            normalization = "unit"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.normalization, Normalization::Unit);
        assert_eq!(config.model.path, PathBuf::from("model.onnx"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = parse_toml_config("[server]\nprot = 1\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_zero_input_size_rejected() {
        let result = parse_toml_config("[model]\ninput_width = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_source_url_prefers_direct_url() {
        let model = ModelConfig {
            url: Some("https://example.com/model.onnx".to_string()),
            gdrive_file_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            model.source_url().as_deref(),
            Some("https://example.com/model.onnx")
        );
    }

    #[test]
    fn test_source_url_from_gdrive_id() {
        let model = ModelConfig {
            gdrive_file_id: Some(" 1l14YM0VFtfKbPnTZNSnAMD2TnIn6Phx4 ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            model.source_url().as_deref(),
            Some("https://drive.google.com/uc?export=download&id=1l14YM0VFtfKbPnTZNSnAMD2TnIn6Phx4")
        );
        assert!(ModelConfig::default().source_url().is_none());
    }

    #[test]
    fn test_resolve_path() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/snapclass"));
        assert_eq!(
            init.resolve_path(Path::new("model.onnx")),
            PathBuf::from("/srv/snapclass/model.onnx")
        );
        assert_eq!(
            init.resolve_path(Path::new("/opt/model.onnx")),
            PathBuf::from("/opt/model.onnx")
        );
    }

    #[test]
    fn test_resolve_against_working_directory() {
        let cwd = Path::new("/home/user/project");
        assert_eq!(
            resolve_against(cwd, Path::new("content/labels.toml")),
            PathBuf::from("/home/user/project/content/labels.toml")
        );
        assert_eq!(
            resolve_against(cwd, Path::new("/etc/snapclass/labels.toml")),
            PathBuf::from("/etc/snapclass/labels.toml")
        );
    }
}

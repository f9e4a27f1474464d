use anyhow::{Context, Result};
use dirs::config_dir;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exclude::{default_rule_specs, ExclusionRules, RuleSpec};
use crate::sync::SyncConfig;
use crate::transport::normalize_remote_path;

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = "sitesync.yml";

/// Main configuration structure for sitesync
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Remote server settings
    #[serde(default)]
    pub ftp: FtpConfig,

    /// Local build output and filtering
    #[serde(default)]
    pub local: LocalConfig,

    /// Build command run before uploading
    #[serde(default)]
    pub build: BuildConfig,

    /// Transfer tuning
    #[serde(default)]
    pub options: TransferOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// FTP server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FtpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Usually left empty and supplied through FTP_USER
    #[serde(default)]
    pub user: String,

    /// Usually left empty and supplied through FTP_PASSWORD
    #[serde(default)]
    pub password: String,

    /// Use explicit FTPS (AUTH TLS)
    #[serde(default)]
    pub secure: bool,

    /// Remote directory the build output is mirrored into
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
}

/// Local build output configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocalConfig {
    /// Directory containing the built site
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Exclusion rules, evaluated in order
    #[serde(default = "default_rule_specs")]
    pub exclude_patterns: Vec<RuleSpec>,

    /// Files larger than this many bytes are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size: Option<u64>,
}

/// Build step configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_build_command")]
    pub command: String,

    /// Directory the build command runs in
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
}

/// Transfer options
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransferOptions {
    /// Extra attempts for a failed upload
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Socket timeout for each upload in seconds
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact", "full"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions
fn default_host() -> String {
    "ftpupload.net".to_string()
}
fn default_port() -> u16 {
    21
}
fn default_remote_dir() -> String {
    "/htdocs".to_string()
}
fn default_build_dir() -> String {
    "dist".to_string()
}
fn default_max_file_size() -> Option<u64> {
    Some(10 * 1024 * 1024)
}
fn default_true() -> bool {
    true
}
fn default_build_command() -> String {
    "npm run build".to_string()
}
fn default_working_dir() -> String {
    ".".to_string()
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_upload_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

// Default implementations
impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            secure: false,
            remote_dir: default_remote_dir(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            exclude_patterns: default_rule_specs(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            command: default_build_command(),
            working_dir: default_working_dir(),
        }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            upload_timeout: default_upload_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_true(),
        }
    }
}

impl Config {
    /// Resolve the configuration for a run
    ///
    /// Lookup order: explicit path, `./sitesync.yml`, the XDG config file,
    /// then built-in defaults. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default()?,
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from the project or user location, or use defaults
    pub fn load_or_default() -> Result<Self> {
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            return Self::load(&local_path);
        }

        if let Ok(user_path) = Self::default_config_path() {
            if user_path.exists() {
                return Self::load(&user_path);
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        let mut config = Self::default();
        config.expand_paths()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the user configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("sitesync").join("config.yml"))
    }

    /// Expand environment variables and normalize configured paths
    pub fn expand_paths(&mut self) -> Result<()> {
        let build_dir = shellexpand::full(&self.local.build_dir)
            .context("Failed to expand build_dir path")?;
        self.local.build_dir = PathBuf::from(build_dir.as_ref())
            .clean()
            .to_string_lossy()
            .into_owned();

        self.build.working_dir = shellexpand::full(&self.build.working_dir)
            .context("Failed to expand working_dir path")?
            .into_owned();

        self.ftp.remote_dir = normalize_remote_path(&self.ftp.remote_dir);

        Ok(())
    }

    /// Apply FTP_* variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply FTP_* overrides from an arbitrary variable source
    ///
    /// Empty values are ignored. `FTP_SECURE` can only enable TLS.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(host) = var("FTP_HOST") {
            self.ftp.host = host;
        }
        if let Some(port) = var("FTP_PORT") {
            self.ftp.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid FTP_PORT value: {}", port))?;
        }
        if let Some(user) = var("FTP_USER") {
            self.ftp.user = user;
        }
        if let Some(password) = var("FTP_PASSWORD") {
            self.ftp.password = password;
        }
        if var("FTP_SECURE").as_deref() == Some("true") {
            self.ftp.secure = true;
        }
        if let Some(remote_dir) = var("FTP_REMOTE_DIR") {
            self.ftp.remote_dir = normalize_remote_path(&remote_dir);
        }

        Ok(())
    }

    /// Build the immutable synchronization settings for one run
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let exclude_rules = ExclusionRules::compile(&self.local.exclude_patterns)
            .context("Failed to compile exclusion rules")?;

        Ok(SyncConfig {
            local_root: PathBuf::from(&self.local.build_dir),
            remote_root: self.ftp.remote_dir.clone(),
            exclude_rules,
            max_file_size: self.local.max_file_size,
        })
    }

    /// Whether login credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.ftp.user.is_empty() && !self.ftp.password.is_empty()
    }

    /// Copy of this configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.ftp.password.is_empty() {
            config.ftp.password = "********".to_string();
        }
        config
    }
}

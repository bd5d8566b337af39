//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, reading the
//! `DA_*` environment variables, and merging configurations with proper
//! precedence rules.

use crate::concurrent::MAX_POOL_SIZE;
use crate::error::DomainAuditError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Panel settings accepted in `[defaults] panel` and `DA_PANEL`.
pub const PANEL_CHOICES: [&str; 4] = ["auto", "cpanel", "directadmin", "none"];

/// Output formats accepted in `[output] default_format`.
pub const OUTPUT_FORMATS: [&str; 3] = ["text", "json", "csv"];

/// Configuration loaded from TOML files.
///
/// This represents the structure of configuration files that operators can
/// create to set default values for a server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Status probe settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeConfig>,

    /// Live validation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,

    /// Output preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Worker pool size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// DNS timeout (as string, e.g., "5s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_timeout: Option<String>,

    /// Live validation timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_timeout: Option<String>,

    /// Status probe timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<String>,

    /// This server's canonical IP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,

    /// Nameserver IP to query instead of the system resolver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<String>,

    /// auto, cpanel, directadmin or none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProbeConfig {
    /// Path requested on every domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// File name prefix for marker files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_prefix: Option<String>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Directory the category lists are written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Default console format: text, json or csv
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which config files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// A `FileError` if the file is missing or unreadable, a `ConfigError`
    /// if it is not valid TOML or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainAuditError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainAuditError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainAuditError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainAuditError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;
        debug!(path = %path.display(), "Loaded config file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        if self.verbose && !loaded_files.is_empty() {
            let files: Vec<String> = loaded_files.iter().map(|p| p.display().to_string()).collect();
            info!(files = %files.join(", "), "Config files loaded (last wins)");
        }

        merged_config
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-audit.toml", "./.domain-audit.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".domain-audit.toml");
        path.exists().then_some(path)
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-audit").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.resolve_timeout.is_some() {
                        lower_defaults.resolve_timeout = higher_defaults.resolve_timeout;
                    }
                    if higher_defaults.validation_timeout.is_some() {
                        lower_defaults.validation_timeout = higher_defaults.validation_timeout;
                    }
                    if higher_defaults.probe_timeout.is_some() {
                        lower_defaults.probe_timeout = higher_defaults.probe_timeout;
                    }
                    if higher_defaults.server_ip.is_some() {
                        lower_defaults.server_ip = higher_defaults.server_ip;
                    }
                    if higher_defaults.nameserver.is_some() {
                        lower_defaults.nameserver = higher_defaults.nameserver;
                    }
                    if higher_defaults.panel.is_some() {
                        lower_defaults.panel = higher_defaults.panel;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            probe: match (lower.probe, higher.probe) {
                (Some(mut lower_probe), Some(higher_probe)) => {
                    if higher_probe.path.is_some() {
                        lower_probe.path = higher_probe.path;
                    }
                    if higher_probe.user_agent.is_some() {
                        lower_probe.user_agent = higher_probe.user_agent;
                    }
                    Some(lower_probe)
                }
                (lower_probe, higher_probe) => higher_probe.or(lower_probe),
            },
            validation: higher.validation.or(lower.validation),
            output: match (lower.output, higher.output) {
                (Some(mut lower_output), Some(higher_output)) => {
                    if higher_output.directory.is_some() {
                        lower_output.directory = higher_output.directory;
                    }
                    if higher_output.default_format.is_some() {
                        lower_output.default_format = higher_output.default_format;
                    }
                    Some(lower_output)
                }
                (lower_output, higher_output) => higher_output.or(lower_output),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainAuditError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_POOL_SIZE {
                    return Err(DomainAuditError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_POOL_SIZE
                    )));
                }
            }

            for (key, value) in [
                ("resolve_timeout", &defaults.resolve_timeout),
                ("validation_timeout", &defaults.validation_timeout),
                ("probe_timeout", &defaults.probe_timeout),
            ] {
                if let Some(value) = value {
                    if parse_duration_string(value).is_none() {
                        return Err(DomainAuditError::config(format!(
                            "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                            key, value
                        )));
                    }
                }
            }

            for (key, value) in [
                ("server_ip", &defaults.server_ip),
                ("nameserver", &defaults.nameserver),
            ] {
                if let Some(value) = value {
                    if value.parse::<IpAddr>().is_err() {
                        return Err(DomainAuditError::config(format!(
                            "Invalid {} '{}': not an IP address",
                            key, value
                        )));
                    }
                }
            }

            if let Some(panel) = &defaults.panel {
                if !PANEL_CHOICES.contains(&panel.to_lowercase().as_str()) {
                    return Err(DomainAuditError::config(format!(
                        "Invalid panel '{}'. Use one of: {}",
                        panel,
                        PANEL_CHOICES.join(", ")
                    )));
                }
            }
        }

        if let Some(validation) = &config.validation {
            if let Some(prefix) = &validation.marker_prefix {
                if prefix.is_empty() || prefix.contains('/') || prefix.contains('\\') {
                    return Err(DomainAuditError::config(format!(
                        "Invalid marker_prefix '{}': must be a non-empty file name prefix",
                        prefix
                    )));
                }
            }
        }

        if let Some(output) = &config.output {
            if let Some(format) = &output.default_format {
                if !OUTPUT_FORMATS.contains(&format.to_lowercase().as_str()) {
                    return Err(DomainAuditError::config(format!(
                        "Invalid default_format '{}'. Use one of: {}",
                        format,
                        OUTPUT_FORMATS.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `DA_*`
/// environment variables. Values are already validated.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub resolve_timeout: Option<Duration>,
    pub validation_timeout: Option<Duration>,
    pub probe_timeout: Option<Duration>,
    pub server_ip: Option<IpAddr>,
    pub nameserver: Option<String>,
    pub panel: Option<String>,
    pub output_dir: Option<String>,
    pub json: Option<bool>,
    pub csv: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Check if output format conflicts exist (JSON and CSV both set).
    pub fn has_output_format_conflict(&self) -> bool {
        matches!((self.json, self.csv), (Some(true), Some(true)))
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("DA_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(n) if (1..=MAX_POOL_SIZE).contains(&n) => env_config.concurrency = Some(n),
            _ => warn!(
                "Invalid DA_CONCURRENCY='{}', must be 1-{}",
                val, MAX_POOL_SIZE
            ),
        }
    }

    env_config.resolve_timeout = env_duration(&lookup, "DA_RESOLVE_TIMEOUT");
    env_config.validation_timeout = env_duration(&lookup, "DA_VALIDATION_TIMEOUT");
    env_config.probe_timeout = env_duration(&lookup, "DA_PROBE_TIMEOUT");

    if let Some(val) = lookup("DA_SERVER_IP") {
        match val.trim().parse::<IpAddr>() {
            Ok(ip) => env_config.server_ip = Some(ip),
            Err(_) => warn!("Invalid DA_SERVER_IP='{}', not an IP address", val),
        }
    }

    if let Some(val) = lookup("DA_NAMESERVER") {
        if val.trim().parse::<IpAddr>().is_ok() {
            env_config.nameserver = Some(val.trim().to_string());
        } else {
            warn!("Invalid DA_NAMESERVER='{}', not an IP address", val);
        }
    }

    if let Some(val) = lookup("DA_PANEL") {
        let panel = val.trim().to_lowercase();
        if PANEL_CHOICES.contains(&panel.as_str()) {
            env_config.panel = Some(panel);
        } else {
            warn!(
                "Invalid DA_PANEL='{}', use one of: {}",
                val,
                PANEL_CHOICES.join(", ")
            );
        }
    }

    env_config.output_dir = env_string(&lookup, "DA_OUTPUT_DIR");
    env_config.json = env_bool(&lookup, "DA_JSON");
    env_config.csv = env_bool(&lookup, "DA_CSV");
    env_config.config = env_string(&lookup, "DA_CONFIG");

    debug!(?env_config, "Environment configuration");
    env_config
}

fn env_string<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<bool> {
    let val = lookup(key)?;
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!("Invalid {}='{}', use true/false", key, val);
            None
        }
    }
}

fn env_duration<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<Duration> {
    let val = lookup(key)?;
    let parsed = parse_duration_string(&val);
    if parsed.is_none() {
        warn!(
            "Invalid {}='{}', use format like '500ms', '5s', '2m'",
            key, val
        );
    }
    parsed
}

/// Parse a duration string like "500ms", "5s", "2m" or a bare number of
/// seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

//! Configuration loading and typed config structures for the automaton service.
//!
//! The canonical configuration lives in `automata-config.yaml` at the project
//! root. Every field has a default, so an empty or missing file yields a
//! working service. A handful of deployment-level values can be overridden
//! from the environment without touching the file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `automata-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ListenConfig,

    /// Generation engine limits and worker pool sizing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// State stream defaults.
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Named rule presets.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `AUTOMATA_HOST` overrides `server.host`
    /// - `AUTOMATA_PORT` overrides `server.port`
    /// - `AUTOMATA_WORKER_THREADS` overrides `engine.worker_threads`
    /// - `AUTOMATA_IDLE_TIMEOUT_SECS` overrides `sessions.idle_timeout_secs`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_file`] when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override deployment values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("AUTOMATA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_override(&lookup, "AUTOMATA_PORT") {
            self.server.port = port;
        }
        if let Some(threads) = parse_override(&lookup, "AUTOMATA_WORKER_THREADS") {
            self.engine.worker_threads = threads;
        }
        if let Some(secs) = parse_override(&lookup, "AUTOMATA_IDLE_TIMEOUT_SECS") {
            self.sessions.idle_timeout_secs = secs;
        }
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_cells == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.max_cells",
                reason: String::from("must be at least 1"),
            });
        }
        if self.engine.max_steps_per_request == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.max_steps_per_request",
                reason: String::from("must be at least 1"),
            });
        }
        if self.streaming.default_every == 0 {
            return Err(ConfigError::Invalid {
                field: "streaming.default_every",
                reason: String::from("must be at least 1"),
            });
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sessions.sweep_interval_secs",
                reason: String::from("must be at least 1"),
            });
        }
        Ok(())
    }
}

fn parse_override<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T>
where
    T::Err: core::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, %err, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Listen address of the transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Generation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Worker threads in the shared step pool (0 = one per CPU).
    #[serde(default)]
    pub worker_threads: usize,

    /// Largest lattice volume a session may request.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,

    /// Largest step count a single request may ask for.
    #[serde(default = "default_max_steps_per_request")]
    pub max_steps_per_request: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_cells: default_max_cells(),
            max_steps_per_request: default_max_steps_per_request(),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionsConfig {
    /// Close sessions idle for longer than this many seconds (0 = never).
    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// Seconds between idle sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// How long a closed identifier keeps answering a repeated close with
    /// success, in seconds (0 = forever). Afterwards it reports not found.
    #[serde(default = "default_closed_retention_secs")]
    pub closed_retention_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 0,
            sweep_interval_secs: default_sweep_interval_secs(),
            closed_retention_secs: default_closed_retention_secs(),
        }
    }
}

/// State stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamingConfig {
    /// Minimum generation advance between stream frames when the client
    /// does not ask for one.
    #[serde(default = "default_every")]
    pub default_every: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            default_every: default_every(),
        }
    }
}

/// Rule presets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Preset name to rule notation.
    #[serde(default = "default_presets")]
    pub presets: BTreeMap<String, String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    50051
}

const fn default_max_cells() -> usize {
    16_777_216
}

const fn default_max_steps_per_request() -> u64 {
    10_000
}

const fn default_sweep_interval_secs() -> u64 {
    30
}

const fn default_closed_retention_secs() -> u64 {
    3600
}

const fn default_every() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_presets() -> BTreeMap<String, String> {
    [
        ("445", "4/4/5/M"),
        ("amoeba", "9-26/5-7,12-13,15/5/M"),
        ("builder", "2,6,9/4,6,8-9/10/M"),
        ("clouds", "13-26/13-14,17-19/2/M"),
        ("crystal-growth", "0-6/1,3/2/VN"),
        ("pyroclastic", "4-7/6-8/10/M"),
        ("life-4555", "4-5/5/2/M"),
    ]
    .into_iter()
    .map(|(name, notation)| (name.to_owned(), notation.to_owned()))
    .collect()
}

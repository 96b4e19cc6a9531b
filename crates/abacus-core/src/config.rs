//! Calculator configuration
//!
//! Settings come from three layers, later layers winning: built-in defaults,
//! an optional TOML file, and `CALCULATOR_*` environment variables. The
//! engine never loads configuration itself; it receives a finished
//! [`CalculatorConfig`] and calls [`CalculatorConfig::validate`] on it.

use crate::error::{CalculatorError, Result};
use crate::operations::MAX_PRECISION;
use encoding_rs::Encoding;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const ENV_CONFIG_PATH: &str = "CALCULATOR_CONFIG_PATH";
pub const ENV_LOG_DIR: &str = "CALCULATOR_LOG_DIR";
pub const ENV_HISTORY_DIR: &str = "CALCULATOR_HISTORY_DIR";
pub const ENV_MAX_HISTORY_SIZE: &str = "CALCULATOR_MAX_HISTORY_SIZE";
pub const ENV_AUTO_SAVE: &str = "CALCULATOR_AUTO_SAVE";
pub const ENV_PRECISION: &str = "CALCULATOR_PRECISION";
pub const ENV_MAX_INPUT_VALUE: &str = "CALCULATOR_MAX_INPUT_VALUE";
pub const ENV_DEFAULT_ENCODING: &str = "CALCULATOR_DEFAULT_ENCODING";

pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;
pub const DEFAULT_PRECISION: u32 = 6;
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const HISTORY_FILE_NAME: &str = "history.csv";
pub const LOG_FILE_NAME: &str = "calculator.log";

fn default_max_input_value() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// Runtime settings for one calculator session
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorConfig {
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub history_dir: PathBuf,
    /// Most calculations kept in history, oldest evicted first
    pub max_history_size: usize,
    /// Persist history after every calculation
    pub auto_save: bool,
    /// Significant digits kept by inexact operations
    pub precision: u32,
    /// Largest accepted operand magnitude
    pub max_input_value: Decimal,
    pub default_encoding: String,
}

/// On-disk form of the configuration; every field is optional
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    log_dir: Option<PathBuf>,
    history_dir: Option<PathBuf>,
    max_history_size: Option<usize>,
    auto_save: Option<bool>,
    precision: Option<u32>,
    max_input_value: Option<toml::Value>,
    default_encoding: Option<String>,
}

impl CalculatorConfig {
    /// Default configuration anchored at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            log_dir: base_dir.join("logs"),
            history_dir: base_dir.join("history"),
            base_dir,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            auto_save: true,
            precision: DEFAULT_PRECISION,
            max_input_value: default_max_input_value(),
            default_encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env(base_dir: impl Into<PathBuf>) -> Self {
        Self::from_lookup(base_dir, |key| std::env::var(key).ok())
    }

    /// Defaults overridden by an arbitrary key lookup
    pub fn from_lookup<F>(base_dir: impl Into<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(base_dir);
        config.apply_overrides(lookup);
        config
    }

    /// Defaults, then the TOML file (explicit path or `CALCULATOR_CONFIG_PATH`), then
    /// the environment.
    pub fn load(base_dir: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::new(base_dir);
        let from_env = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        if let Some(path) = config_path.map(Path::to_path_buf).or(from_env) {
            config.apply_file(&path)?;
        }
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults overridden by a TOML file
    pub fn from_file(base_dir: impl Into<PathBuf>, path: &Path) -> Result<Self> {
        let mut config = Self::new(base_dir);
        config.apply_file(path)?;
        Ok(config)
    }

    pub fn history_file(&self) -> PathBuf {
        self.history_dir.join(HISTORY_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    /// Text encoding named by `default_encoding`, resolved as a WHATWG label
    /// (`latin-1` and `ascii` resolve to windows-1252)
    pub fn history_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.default_encoding.trim().as_bytes()).ok_or_else(|| {
            CalculatorError::configuration(
                "default_encoding",
                format!("unknown encoding '{}'", self.default_encoding),
            )
        })
    }

    /// Replaces out-of-range values with defaults and creates both directories.
    ///
    /// Fails only when a directory cannot be created or the encoding label is
    /// unknown.
    pub fn validate(&mut self) -> Result<()> {
        if self.max_history_size == 0 {
            warn!(
                default = DEFAULT_MAX_HISTORY_SIZE,
                "max_history_size must be positive, using default"
            );
            self.max_history_size = DEFAULT_MAX_HISTORY_SIZE;
        }
        if self.precision == 0 {
            warn!(default = DEFAULT_PRECISION, "precision must be positive, using default");
            self.precision = DEFAULT_PRECISION;
        } else if self.precision > MAX_PRECISION {
            warn!(precision = self.precision, max = MAX_PRECISION, "precision capped");
            self.precision = MAX_PRECISION;
        }
        if self.max_input_value <= Decimal::ZERO {
            warn!("max_input_value must be positive, using default");
            self.max_input_value = default_max_input_value();
        }
        if self.default_encoding.trim().is_empty() {
            self.default_encoding = DEFAULT_ENCODING.to_string();
        }
        let encoding = self.history_encoding()?;
        debug!(encoding = encoding.name(), "History file encoding");

        for (setting, dir) in [("log_dir", &self.log_dir), ("history_dir", &self.history_dir)] {
            fs::create_dir_all(dir).map_err(|e| {
                CalculatorError::configuration(
                    setting,
                    format!("cannot create directory {}: {e}", dir.display()),
                )
            })?;
        }
        Ok(())
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| {
            CalculatorError::configuration(
                "config_path",
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| {
            CalculatorError::configuration(
                "config_path",
                format!("invalid config file {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), "Applying configuration file");

        if let Some(dir) = file.log_dir {
            self.log_dir = self.base_dir.join(dir);
        }
        if let Some(dir) = file.history_dir {
            self.history_dir = self.base_dir.join(dir);
        }
        if let Some(size) = file.max_history_size {
            self.max_history_size = size;
        }
        if let Some(auto_save) = file.auto_save {
            self.auto_save = auto_save;
        }
        if let Some(precision) = file.precision {
            self.precision = precision;
        }
        if let Some(value) = file.max_input_value {
            let text = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            self.max_input_value = parse_decimal_text(&text).ok_or_else(|| {
                CalculatorError::configuration(
                    "max_input_value",
                    format!("'{text}' is not a number"),
                )
            })?;
        }
        if let Some(encoding) = file.default_encoding {
            self.default_encoding = encoding;
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = value(ENV_LOG_DIR) {
            self.log_dir = self.base_dir.join(dir);
        }
        if let Some(dir) = value(ENV_HISTORY_DIR) {
            self.history_dir = self.base_dir.join(dir);
        }
        if let Some(raw) = value(ENV_MAX_HISTORY_SIZE) {
            self.max_history_size = parse_or(ENV_MAX_HISTORY_SIZE, &raw, self.max_history_size);
        }
        if let Some(raw) = value(ENV_AUTO_SAVE) {
            self.auto_save = parse_flag(&raw);
        }
        if let Some(raw) = value(ENV_PRECISION) {
            self.precision = parse_or(ENV_PRECISION, &raw, self.precision);
        }
        if let Some(raw) = value(ENV_MAX_INPUT_VALUE) {
            match parse_decimal_text(&raw) {
                Some(limit) => self.max_input_value = limit,
                None => warn!(key = ENV_MAX_INPUT_VALUE, value = %raw, "ignoring unparseable value"),
            }
        }
        if let Some(encoding) = value(ENV_DEFAULT_ENCODING) {
            self.default_encoding = encoding;
        }
    }
}

/// Parses plain (`12.5`) or scientific (`1e12`) decimal text
pub(crate) fn parse_decimal_text(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str_exact(text)
        .or_else(|_| Decimal::from_str(text))
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: &str, fallback: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(key, value = %raw, "ignoring unparseable value");
        fallback
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

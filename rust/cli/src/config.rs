//! Resolves which catalog file the commands operate on.
//!
//! Order: built-in default, then the TOML file named by `INTROSPECT_CONFIG`,
//! then `INTROSPECT_QUESTIONS`. A `--file` flag beats all of them and is
//! applied by the commands themselves.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "INTROSPECT_CONFIG";
pub const QUESTIONS_ENV: &str = "INTROSPECT_QUESTIONS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub questions: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            questions: PathBuf::from("questions.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
    Cli,
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: Config,
    pub questions_source: ValueSource,
}

impl ConfigResolved {
    /// The catalog path, with an explicit `--file` taking precedence.
    pub fn catalog_path(&self, flag: Option<PathBuf>) -> (PathBuf, ValueSource) {
        match flag {
            Some(path) => (path, ValueSource::Cli),
            None => (self.config.questions.clone(), self.questions_source),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "unable to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "unable to parse config file: {}", e),
            ConfigError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

pub fn load_with_sources() -> Result<ConfigResolved, ConfigError> {
    let mut cfg = Config::default();
    let mut source = ValueSource::Default;

    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        let s = fs::read_to_string(path)?;
        let f: FileConfig = toml::from_str(&s)?;
        if let Some(v) = f.questions {
            cfg.questions = v;
            source = ValueSource::File;
        }
    }

    if let Ok(questions) = std::env::var(QUESTIONS_ENV)
        && !questions.is_empty()
    {
        cfg.questions = PathBuf::from(questions);
        source = ValueSource::Env;
    }

    validate(&cfg)?;
    Ok(ConfigResolved {
        config: cfg,
        questions_source: source,
    })
}

// the server's config file carries more keys; only the catalog path matters here
#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    questions: Option<PathBuf>,
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.questions.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "Invalid configuration: questions path cannot be empty".into(),
        ));
    }
    Ok(())
}

//! Server settings, resolved from defaults, an optional TOML file, the
//! environment and finally command-line flags. Later layers win.

use crate::connection::ConnectionOptions;
use crate::logging::LogFormat;
use crate::registry::RegistrySettings;
use crate::room::RoomOptions;
use introspect_engine::{GameConfig, ScoringRules};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "INTROSPECT_CONFIG";
pub const PORT_ENV: &str = "INTROSPECT_PORT";
pub const QUESTIONS_ENV: &str = "INTROSPECT_QUESTIONS";
pub const SEED_ENV: &str = "INTROSPECT_SEED";
pub const LOG_FORMAT_ENV: &str = "INTROSPECT_LOG_FORMAT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Question catalog, loaded once at startup
    pub questions: PathBuf,
    /// Fixes the catalog shuffle when set
    pub seed: Option<u64>,
    /// How long an enqueue may wait on a full outbound queue before the
    /// player is dropped
    pub send_timeout_ms: u64,
    pub outbound_capacity: usize,
    /// Pause between the last question's results and the round totals
    pub results_delay_ms: u64,
    pub questions_per_round: u32,
    pub rounds_per_game: Option<u32>,
    pub scoring: ScoringRules,
    pub log_format: LogFormat,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let game = GameConfig::default();
        let connection = ConnectionOptions::default();
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            questions: PathBuf::from("questions.json"),
            seed: None,
            send_timeout_ms: connection.send_timeout.as_millis() as u64,
            outbound_capacity: connection.outbound_capacity,
            results_delay_ms: 5_000,
            questions_per_round: game.questions_per_round,
            rounds_per_game: game.rounds_per_game,
            scoring: game.scoring,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("host cannot be empty".into()));
        }
        if self.outbound_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "outbound_capacity must be greater than 0".into(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "send_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.questions_per_round == 0 {
            return Err(SettingsError::InvalidValue(
                "questions_per_round must be greater than 0".into(),
            ));
        }
        if self.rounds_per_game == Some(0) {
            return Err(SettingsError::InvalidValue(
                "rounds_per_game must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            questions_per_round: self.questions_per_round,
            rounds_per_game: self.rounds_per_game,
            scoring: self.scoring,
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            outbound_capacity: self.outbound_capacity,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            game: self.game_config(),
            room: RoomOptions {
                connection: self.connection_options(),
                results_delay: Duration::from_millis(self.results_delay_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
    Cli,
}

/// Where the externally overridable settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsSources {
    pub host: ValueSource,
    pub port: ValueSource,
    pub questions: ValueSource,
    pub seed: ValueSource,
}

impl Default for SettingsSources {
    fn default() -> Self {
        Self {
            host: ValueSource::Default,
            port: ValueSource::Default,
            questions: ValueSource::Default,
            seed: ValueSource::Default,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub questions: Option<PathBuf>,
    pub seed: Option<u64>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone)]
pub struct SettingsResolved {
    pub settings: ServerSettings,
    pub sources: SettingsSources,
}

impl SettingsResolved {
    /// Applies command-line overrides on top of the resolved settings.
    pub fn apply(mut self, overrides: SettingsOverrides) -> Result<Self, SettingsError> {
        if let Some(host) = overrides.host {
            self.settings.host = host;
            self.sources.host = ValueSource::Cli;
        }
        if let Some(port) = overrides.port {
            self.settings.port = port;
            self.sources.port = ValueSource::Cli;
        }
        if let Some(questions) = overrides.questions {
            self.settings.questions = questions;
            self.sources.questions = ValueSource::Cli;
        }
        if let Some(seed) = overrides.seed {
            self.settings.seed = Some(seed);
            self.sources.seed = ValueSource::Cli;
        }
        if let Some(format) = overrides.log_format {
            self.settings.log_format = format;
        }
        self.settings.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unable to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    questions: Option<PathBuf>,
    seed: Option<u64>,
    send_timeout_ms: Option<u64>,
    outbound_capacity: Option<usize>,
    results_delay_ms: Option<u64>,
    questions_per_round: Option<u32>,
    rounds_per_game: Option<u32>,
    scoring: Option<ScoringRules>,
    log_format: Option<LogFormat>,
}

/// Resolves settings from the process environment.
pub fn load() -> Result<SettingsResolved, SettingsError> {
    load_with(|name| std::env::var(name).ok())
}

/// Resolves settings, reading variables through `var`.
pub fn load_with(var: impl Fn(&str) -> Option<String>) -> Result<SettingsResolved, SettingsError> {
    let mut settings = ServerSettings::default();
    let mut sources = SettingsSources::default();

    if let Some(path) = var(CONFIG_ENV).filter(|p| !p.is_empty()) {
        let file = read_file(Path::new(&path))?;
        apply_file(&mut settings, &mut sources, file);
    }

    if let Some(port) = non_empty(var(PORT_ENV)) {
        settings.port = port.parse().map_err(|_| SettingsError::InvalidEnv {
            var: PORT_ENV,
            value: port.clone(),
        })?;
        sources.port = ValueSource::Env;
    }
    if let Some(questions) = non_empty(var(QUESTIONS_ENV)) {
        settings.questions = PathBuf::from(questions);
        sources.questions = ValueSource::Env;
    }
    if let Some(seed) = non_empty(var(SEED_ENV)) {
        settings.seed = Some(seed.parse().map_err(|_| SettingsError::InvalidEnv {
            var: SEED_ENV,
            value: seed.clone(),
        })?);
        sources.seed = ValueSource::Env;
    }
    if let Some(format) = non_empty(var(LOG_FORMAT_ENV)) {
        settings.log_format = format.parse().map_err(|_| SettingsError::InvalidEnv {
            var: LOG_FORMAT_ENV,
            value: format.clone(),
        })?;
    }

    settings.validate()?;
    Ok(SettingsResolved { settings, sources })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_file(path: &Path) -> Result<FileSettings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn apply_file(settings: &mut ServerSettings, sources: &mut SettingsSources, file: FileSettings) {
    if let Some(v) = file.host {
        settings.host = v;
        sources.host = ValueSource::File;
    }
    if let Some(v) = file.port {
        settings.port = v;
        sources.port = ValueSource::File;
    }
    if let Some(v) = file.questions {
        settings.questions = v;
        sources.questions = ValueSource::File;
    }
    if let Some(v) = file.seed {
        settings.seed = Some(v);
        sources.seed = ValueSource::File;
    }
    if let Some(v) = file.send_timeout_ms {
        settings.send_timeout_ms = v;
    }
    if let Some(v) = file.outbound_capacity {
        settings.outbound_capacity = v;
    }
    if let Some(v) = file.results_delay_ms {
        settings.results_delay_ms = v;
    }
    if let Some(v) = file.questions_per_round {
        settings.questions_per_round = v;
    }
    if let Some(v) = file.rounds_per_game {
        settings.rounds_per_game = Some(v);
    }
    if let Some(v) = file.scoring {
        settings.scoring = v;
    }
    if let Some(v) = file.log_format {
        settings.log_format = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = ServerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.questions_per_round, 4);
        assert_eq!(settings.outbound_capacity, 64);
    }

    #[test]
    fn no_environment_gives_defaults() {
        let resolved = load_with(env(&[])).expect("load");
        assert_eq!(resolved.settings, ServerSettings::default());
        assert_eq!(resolved.sources, SettingsSources::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let file = config_file(
            r#"
            port = 9000
            questions = "/srv/questions.json"
            results_delay_ms = 0
            rounds_per_game = 5

            [scoring]
            most_voted_points = 5
            neutral_points = 2
            least_voted_points = 4
            "#,
        );
        let path = file.path().display().to_string();
        let resolved = load_with(env(&[(CONFIG_ENV, path.as_str())])).expect("load");

        assert_eq!(resolved.settings.port, 9000);
        assert_eq!(resolved.settings.questions, PathBuf::from("/srv/questions.json"));
        assert_eq!(resolved.settings.results_delay_ms, 0);
        assert_eq!(resolved.settings.rounds_per_game, Some(5));
        assert_eq!(resolved.settings.scoring.most_voted_points, 5);
        assert_eq!(resolved.sources.port, ValueSource::File);
        assert_eq!(resolved.sources.host, ValueSource::Default);
    }

    #[test]
    fn environment_overrides_file() {
        let file = config_file("port = 9000\nseed = 1\n");
        let path = file.path().display().to_string();
        let resolved = load_with(env(&[
            (CONFIG_ENV, path.as_str()),
            (PORT_ENV, "9100"),
            (SEED_ENV, "42"),
        ]))
        .expect("load");

        assert_eq!(resolved.settings.port, 9100);
        assert_eq!(resolved.settings.seed, Some(42));
        assert_eq!(resolved.sources.port, ValueSource::Env);
        assert_eq!(resolved.sources.seed, ValueSource::Env);
    }

    #[test]
    fn cli_overrides_everything() {
        let resolved = load_with(env(&[(PORT_ENV, "9100")]))
            .expect("load")
            .apply(SettingsOverrides {
                port: Some(9200),
                questions: Some(PathBuf::from("custom.json")),
                ..Default::default()
            })
            .expect("apply");

        assert_eq!(resolved.settings.port, 9200);
        assert_eq!(resolved.sources.port, ValueSource::Cli);
        assert_eq!(resolved.sources.questions, ValueSource::Cli);
    }

    #[test]
    fn rejects_bad_environment_values() {
        let err = load_with(env(&[(PORT_ENV, "eighty")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnv { var: PORT_ENV, .. }));

        let err = load_with(env(&[(SEED_ENV, "-1")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnv { var: SEED_ENV, .. }));
    }

    #[test]
    fn log_format_comes_from_file_then_environment() {
        let file = config_file("log_format = \"json\"\n");
        let path = file.path().display().to_string();
        let resolved = load_with(env(&[(CONFIG_ENV, path.as_str())])).expect("load");
        assert_eq!(resolved.settings.log_format, LogFormat::Json);

        let resolved = load_with(env(&[(CONFIG_ENV, path.as_str()), (LOG_FORMAT_ENV, "text")]))
            .expect("load");
        assert_eq!(resolved.settings.log_format, LogFormat::Text);

        let err = load_with(env(&[(LOG_FORMAT_ENV, "yaml")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnv { var: LOG_FORMAT_ENV, .. }));
    }

    #[test]
    fn empty_variables_are_ignored() {
        let resolved = load_with(env(&[(PORT_ENV, ""), (CONFIG_ENV, "")])).expect("load");
        assert_eq!(resolved.settings.port, 8080);
    }

    #[test]
    fn rejects_zero_capacities_and_round_sizes() {
        for contents in [
            "outbound_capacity = 0",
            "send_timeout_ms = 0",
            "questions_per_round = 0",
            "rounds_per_game = 0",
        ] {
            let file = config_file(contents);
            let path = file.path().display().to_string();
            let err = load_with(env(&[(CONFIG_ENV, path.as_str())])).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidValue(_)), "{contents}");
        }
    }

    #[test]
    fn unknown_keys_and_missing_files_are_errors() {
        let file = config_file("colour = \"blue\"");
        let path = file.path().display().to_string();
        assert!(matches!(
            load_with(env(&[(CONFIG_ENV, path.as_str())])),
            Err(SettingsError::Parse { .. })
        ));

        assert!(matches!(
            load_with(env(&[(CONFIG_ENV, "/definitely/not/here.toml")])),
            Err(SettingsError::Io { .. })
        ));
    }

    #[test]
    fn converts_into_runtime_options() {
        let settings = ServerSettings {
            send_timeout_ms: 250,
            outbound_capacity: 8,
            results_delay_ms: 0,
            ..Default::default()
        };
        let registry = settings.registry_settings();
        assert_eq!(registry.room.connection.outbound_capacity, 8);
        assert_eq!(registry.room.connection.send_timeout, Duration::from_millis(250));
        assert!(registry.room.results_delay.is_zero());
        assert_eq!(registry.game, settings.game_config());
    }
}

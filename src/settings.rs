use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::io::serial::SerialConfig;
use crate::io::FramingConfig;
use crate::rotor::{Rotor, RotorMode, SubstitutionTable, TableMapper, LATIN_UPPER};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AppSettings {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub rotor: RotorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MapperKind {
    #[default]
    Rotor,
    Table,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RotorSettings {
    #[serde(default)]
    pub kind: MapperKind,
    #[serde(default)]
    pub mode: RotorMode,
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    #[serde(default)]
    pub position: i64,
    /// Only for `kind = "table"`; single-character keys and values
    #[serde(default)]
    pub table: BTreeMap<String, String>,
}

fn default_alphabet() -> String {
    LATIN_UPPER.to_string()
}

impl Default for RotorSettings {
    fn default() -> Self {
        RotorSettings {
            kind: MapperKind::default(),
            mode: RotorMode::default(),
            alphabet: default_alphabet(),
            position: 0,
            table: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for timestamped log files; file logging is off when unset
    #[serde(default)]
    pub reports_dir: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
}

impl RotorSettings {
    /// Build the configured mapper.
    pub fn build(&self) -> Result<Box<dyn SubstitutionTable + Send>, SettingsError> {
        match self.kind {
            MapperKind::Rotor => {
                let rotor = Rotor::new(&self.alphabet, self.position, self.mode)
                    .map_err(|e| SettingsError::Invalid(e.to_string()))?;
                Ok(Box::new(rotor))
            }
            MapperKind::Table => {
                let mut entries = Vec::with_capacity(self.table.len());
                for (from, to) in &self.table {
                    entries.push((single_char(from)?, single_char(to)?));
                }
                Ok(Box::new(entries.into_iter().collect::<TableMapper>()))
            }
        }
    }
}

fn single_char(s: &str) -> Result<char, SettingsError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(SettingsError::Invalid(format!(
            "rotor table entries must be single characters, got {:?}",
            s
        ))),
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.framing
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        self.rotor.build()?;
        Ok(())
    }
}

/// `<config dir>/rotorwire/settings.toml`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rotorwire").join("settings.toml"))
}

/// Load settings from `path`, or from the default location when `None`.
/// An explicit path must exist; a missing default file means defaults.
pub fn load_settings(path: Option<&Path>) -> Result<AppSettings, SettingsError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_settings_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(AppSettings::default()),
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
        path: path.clone(),
        source,
    })?;
    let settings = parse_settings(&content).map_err(|source| SettingsError::Parse {
        path: path.clone(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

pub fn parse_settings(content: &str) -> Result<AppSettings, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::serial::Parity;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.framing.max_timeouts, 50);
        assert_eq!(settings.framing.backoff_ms, 1);
        assert_eq!(settings.serial.baud_rate, 9600);
    }

    #[test]
    fn test_partial_sections() {
        let settings = parse_settings(
            r#"
            [serial]
            port = "ttyACM0"
            parity = "even"

            [framing]
            max_line_len = 16

            [rotor]
            mode = "stepping"
            position = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.serial.port, "ttyACM0");
        assert_eq!(settings.serial.parity, Parity::Even);
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.framing.max_line_len, 16);
        assert_eq!(settings.framing.max_timeouts, 50);
        assert_eq!(settings.rotor.mode, RotorMode::Stepping);
        assert_eq!(settings.rotor.alphabet, LATIN_UPPER);
    }

    #[test]
    fn test_table_mapper_from_settings() {
        let settings = parse_settings(
            r#"
            [rotor]
            kind = "table"
            table = { a = "x", b = "y" }
            "#,
        )
        .unwrap();

        let mut mapper = settings.rotor.build().unwrap();
        assert_eq!(mapper.map('a'), 'x');
        assert_eq!(mapper.map('q'), 'q');
    }

    #[test]
    fn test_invalid_table_entry() {
        let mut rotor = RotorSettings {
            kind: MapperKind::Table,
            ..RotorSettings::default()
        };
        rotor.table.insert("ab".to_string(), "x".to_string());
        assert!(matches!(rotor.build(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_line_len() {
        let mut settings = AppSettings::default();
        settings.framing.max_line_len = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_single_slot_line() {
        let settings = parse_settings("[framing]\nmax_line_len = 1\n").unwrap();
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[framing]\nmax_timeouts = 10\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.framing.max_timeouts, 10);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = load_settings(Some(Path::new("/nonexistent/rotorwire.toml")));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn test_load_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[framing\n").unwrap();
        assert!(matches!(load_settings(Some(&path)), Err(SettingsError::Parse { .. })));
    }
}

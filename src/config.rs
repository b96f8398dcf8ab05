//! Application configuration
//!
//! The configuration is read once at startup from a TOML file and turned into
//! a [Config] value that is passed by reference to everything that needs it.
//!
//! ```toml
//! [path]
//! kepub_cmd = "/usr/local/bin/kepubify"
//! output_folder = "~/Books/kobo"
//!
//! [logging]
//! level = "info"
//! format = "{time} - {level} - {message}"
//!
//! [conversion]
//! target = "zh-Hant"
//! reveal_output = true
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::LevelFilter;
use serde::Deserialize;

use crate::{error::ConfigError, transliterate::TargetScript};

/// File name looked up next to the executable when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "kepub_converter.toml";

pub const DEFAULT_LOG_FORMAT: &str = "{time} - {level} - {message}";

/// Validated application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path of the kepubify executable
    pub kepub_cmd: PathBuf,

    /// Directory the converter writes kepub files into
    pub output_folder: PathBuf,

    pub log_level: LevelFilter,

    /// Log line template, see [crate::logger::LogFormat]
    pub log_format: String,

    /// Traditional Chinese flavour Simplified Chinese books are converted to
    pub target: TargetScript,

    /// Open the output folder in the file browser after a successful run
    pub reveal_output: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    path: Option<RawPathSection>,
    #[serde(default)]
    logging: RawLoggingSection,
    #[serde(default)]
    conversion: RawConversionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPathSection {
    kepub_cmd: Option<String>,
    output_folder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLoggingSection {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConversionSection {
    target: Option<String>,
    reveal_output: Option<bool>,
}

impl Config {
    /// Loads and validates the configuration file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            err => err,
        })
    }

    /// Parses and validates configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source: Box::new(source),
        })?;

        let path = raw.path.unwrap_or_default();
        let kepub_cmd = required(path.kepub_cmd, "path", "kepub_cmd")?;
        let output_folder = required(path.output_folder, "path", "output_folder")?;

        let log_level = match raw.logging.level {
            Some(level) => parse_level(&level)?,
            None => LevelFilter::Info,
        };
        let target = match raw.conversion.target {
            Some(target) => TargetScript::from_str(&target)?,
            None => TargetScript::default(),
        };

        Ok(Self {
            kepub_cmd: expand_home(&kepub_cmd),
            output_folder: expand_home(&output_folder),
            log_level,
            log_format: raw
                .logging
                .format
                .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
            target,
            reveal_output: raw.conversion.reveal_output.unwrap_or(true),
        })
    }

    /// The configuration file used when none is given on the command line
    ///
    /// This is [DEFAULT_CONFIG_FILE] in the directory of the running
    /// executable, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

fn required(value: Option<String>, section: &str, key: &str) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
}

/// Parses a log level name, case-insensitively
///
/// `warning` and `critical` are accepted as aliases of `warn` and `error`.
pub fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" | "critical" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(ConfigError::InvalidValue {
            key: "level".to_string(),
            value: level.to_string(),
        }),
    }
}

/// Expands a leading `~` to the user's home directory
fn expand_home(path: &str) -> PathBuf {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));

    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => PathBuf::from(home),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            PathBuf::from(home).join(&rest[1..])
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use log::LevelFilter;

    use crate::{
        config::{Config, DEFAULT_LOG_FORMAT, parse_level},
        error::ConfigError,
        transliterate::TargetScript,
    };

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [path]
            kepub_cmd = "/usr/local/bin/kepubify"
            output_folder = "/books/kobo"

            [logging]
            level = "DEBUG"
            format = "{level}: {message}"

            [conversion]
            target = "zh-TW"
            reveal_output = false
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            Config {
                kepub_cmd: PathBuf::from("/usr/local/bin/kepubify"),
                output_folder: PathBuf::from("/books/kobo"),
                log_level: LevelFilter::Debug,
                log_format: "{level}: {message}".to_string(),
                target: TargetScript::Taiwan,
                reveal_output: false,
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse(
            r#"
            [path]
            kepub_cmd = "kepubify"
            output_folder = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.log_format, DEFAULT_LOG_FORMAT);
        assert_eq!(config.target, TargetScript::Traditional);
        assert!(config.reveal_output);
    }

    #[test]
    fn test_parse_missing_section() {
        let result = Config::parse("[logging]\nlevel = \"info\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::MissingKey { section, key }) if section == "path" && key == "kepub_cmd"
        ));
    }

    #[test]
    fn test_parse_missing_output_folder() {
        let result = Config::parse("[path]\nkepub_cmd = \"kepubify\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::MissingKey { key, .. }) if key == "output_folder"
        ));
    }

    #[test]
    fn test_parse_empty_value_is_missing() {
        let result = Config::parse("[path]\nkepub_cmd = \"  \"\noutput_folder = \"out\"\n");
        assert!(matches!(result, Err(ConfigError::MissingKey { .. })));
    }

    #[test]
    fn test_parse_malformed_toml() {
        let result = Config::parse("[path\nkepub_cmd = ");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_unknown_key() {
        let result = Config::parse(
            "[path]\nkepub_cmd = \"k\"\noutput_folder = \"o\"\nkepubCmd = \"typo\"\n",
        );
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_invalid_values() {
        let base = "[path]\nkepub_cmd = \"k\"\noutput_folder = \"o\"\n";

        let result = Config::parse(&format!("{base}[logging]\nlevel = \"loud\"\n"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "level"));

        let result = Config::parse(&format!("{base}[conversion]\ntarget = \"zh-Hans\"\n"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "target"));
    }

    #[test]
    fn test_parse_level_aliases() {
        assert_eq!(parse_level("warning").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("CRITICAL").unwrap(), LevelFilter::Error);
        assert_eq!(parse_level(" trace ").unwrap(), LevelFilter::Trace);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("./no/such/kepub_converter.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_reports_file_path_on_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        match Config::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use log::LevelFilter;
use serde::Deserialize;
use spi_core::language::interpreter::MAX_CALL_DEPTH_LIMIT;
use spi_core::RunOptions;

pub const DEFAULT_CONFIG_FILE: &str = "spi.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logger: LoggerConfig,
    pub interpreter: RunOptions,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub console_level: String,
    pub file_level: String,
    /// Directory for log files; no file is written when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            console_level: "warn".to_string(),
            file_level: "debug".to_string(),
            dir: None,
        }
    }
}

impl Config {
    /// Rejects settings the interpreter cannot honour.
    pub fn validate(&self) -> Result<(), String> {
        check_call_depth(self.interpreter.max_call_depth).map(|_| ())
    }
}

impl LoggerConfig {
    pub fn console_filter(&self) -> Result<LevelFilter, Box<dyn std::error::Error>> {
        parse_level(&self.console_level)
    }

    pub fn file_filter(&self) -> Result<LevelFilter, Box<dyn std::error::Error>> {
        parse_level(&self.file_level)
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, Box<dyn std::error::Error>> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| format!("Unknown log level '{}'", level).into())
}

fn check_call_depth(depth: usize) -> Result<usize, String> {
    if (1..=MAX_CALL_DEPTH_LIMIT).contains(&depth) {
        Ok(depth)
    } else {
        Err(format!("max_call_depth must be between 1 and {}, got {}", MAX_CALL_DEPTH_LIMIT, depth))
    }
}

/// Value parser for `--max-depth`.
pub fn parse_call_depth(value: &str) -> Result<usize, String> {
    let depth = value
        .parse::<usize>()
        .map_err(|e| format!("'{}' is not a call depth: {}", value, e))?;
    check_call_depth(depth)
}

/// Reads `path`, or `spi.toml` in the working directory when no path is given.
/// A missing default file yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
        None => return Ok(Config::default()),
    };

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
    let config = parse_config(&content)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid config file '{}': {}", path.display(), e))?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::de::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = parse_config("[interpreter]\nlog_stack = true\n").unwrap();
        assert!(config.interpreter.log_stack);
        assert!(!config.interpreter.log_scope);
        assert_eq!(config.interpreter.max_call_depth, RunOptions::default().max_call_depth);
        assert_eq!(config.logger.console_filter().unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn logger_section_is_read() {
        let config = parse_config("[logger]\nconsole_level = \"trace\"\ndir = \"logs\"\n").unwrap();
        assert_eq!(config.logger.console_filter().unwrap(), LevelFilter::Trace);
        assert_eq!(config.logger.dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn call_depth_must_fit_the_limit() {
        let config = parse_config("[interpreter]\nmax_call_depth = 1000000\n").unwrap();
        assert!(config.validate().unwrap_err().contains("max_call_depth"));

        let config = parse_config(&format!("[interpreter]\nmax_call_depth = {}\n", MAX_CALL_DEPTH_LIMIT)).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(parse_call_depth("64"), Ok(64));
        assert!(parse_call_depth("0").is_err());
        assert!(parse_call_depth(&(MAX_CALL_DEPTH_LIMIT + 1).to_string()).is_err());
        assert!(parse_call_depth("deep").is_err());
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let config = parse_config("[logger]\nfile_level = \"loud\"\n").unwrap();
        assert!(config.logger.file_filter().is_err());
    }
}

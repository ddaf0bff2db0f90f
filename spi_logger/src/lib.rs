use chrono::Local;
use colored::*;
use log::{Level, LevelFilter};
use std::path::{Path, PathBuf};

const LOGS_PREFIX: &str = "spi_log";
const SEPARATOR: &str = "_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const LOG_EXTENSION: &str = "log";
const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn log_file_name() -> String {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    format!("{}{}{}.{}", LOGS_PREFIX, SEPARATOR, timestamp, LOG_EXTENSION)
}

fn colored_level(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red().bold(),
        Level::Warn => "WARN ".yellow().bold(),
        Level::Info => "INFO ".green().bold(),
        Level::Debug => "DEBUG".blue().bold(),
        Level::Trace => "TRACE".magenta().bold(),
    }
}

/// Installs the global logger.
///
/// Console output goes to stderr so program results on stdout stay clean.
/// When `log_dir` is given, a timestamped file is created there as well and
/// receives records up to `file_level`.
pub fn init(
    log_dir: Option<impl AsRef<Path>>,
    console_level: LevelFilter,
    file_level: LevelFilter,
) -> Result<(), fern::InitError> {
    let mut log_file_path: Option<PathBuf> = None;

    if let Some(dir) = log_dir {
        let dir_path = dir.as_ref();
        std::fs::create_dir_all(dir_path).map_err(|e| {
            fern::InitError::Io(std::io::Error::new(
                e.kind(),
                format!("Could not create log directory '{}': {}", dir_path.display(), e),
            ))
        })?;
        log_file_path = Some(dir_path.join(log_file_name()));
    }

    let console_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                Local::now().format(LINE_TIMESTAMP_FORMAT),
                colored_level(record.level()),
                record.target(),
                message
            ))
        })
        .level(console_level)
        .chain(std::io::stderr());

    let mut base_dispatch = fern::Dispatch::new()
        .level(console_level.max(if log_file_path.is_some() { file_level } else { LevelFilter::Off }))
        .chain(console_dispatch);

    if let Some(path) = &log_file_path {
        let file_dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] [{:<5}] [{}] [{}:{}] {}",
                    Local::now().format(LINE_TIMESTAMP_FORMAT),
                    record.level(),
                    record.target(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    message
                ))
            })
            .level(file_level)
            .chain(fern::log_file(path)?);

        base_dispatch = base_dispatch.chain(file_dispatch);
    }

    base_dispatch.apply()?;

    log::debug!("Logger ready. Console level: {}, file level: {}", console_level, file_level);
    match &log_file_path {
        Some(path) => log::debug!("Writing log file: {}", path.display()),
        None => log::debug!("File logging disabled"),
    }

    Ok(())
}

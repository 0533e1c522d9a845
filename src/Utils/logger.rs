use crate::settings::{SettingsError, YieldSettings};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Cannot create log file '{file}': {source}")]
    LogFile {
        file: String,
        source: std::io::Error,
    },
    #[error("Logger already initialized: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Terminal logger plus an optional file logger, both at the configured level.
/// The file logger records everything down to debug when the terminal level is lower.
pub fn init_logging(settings: &YieldSettings) -> Result<(), LoggerError> {
    let level = settings.level_filter()?;
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(file) = &settings.log_file {
        let log_file = File::create(file).map_err(|source| LoggerError::LogFile {
            file: file.clone(),
            source,
        })?;
        loggers.push(WriteLogger::new(
            level.max(LevelFilter::Debug),
            Config::default(),
            log_file,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

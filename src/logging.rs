use std::fs;
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use simplelog::*;

use crate::config::Configuration;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Installs a terminal logger, plus a file logger when `file_path` is given.
/// Only the first call has any effect.
pub fn initialize_loggers<P: Into<PathBuf>>(file_path: Option<P>) {
    fn _initializer(file_path: Option<PathBuf>) {
        let log_level: LevelFilter = Configuration::get().log_level.into();
        let mut combined: Vec<Box<dyn SharedLogger>> = Vec::new();
        if let Some(file_path) = file_path {
            match fs::File::create(&file_path) {
                Ok(file) => combined.push(WriteLogger::new(log_level, Config::default(), file)),
                Err(e) => eprintln!("not able to create log file {}: {}", file_path.display(), e),
            }
        }
        if let Some(term_logger) =
            TermLogger::new(log_level, Config::default(), TerminalMode::Mixed)
        {
            let logger: Box<dyn SharedLogger> = term_logger;
            combined.push(logger);
        }
        // Another logger may already be installed by the embedding application.
        if CombinedLogger::init(combined).is_err() {
            log::debug!("global logger already set, keeping it");
        }
    }

    LOGGER.get_or_init(move || _initializer(file_path.map(Into::into)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("hdfile.log");
        initialize_loggers(Some(&log_file));
        initialize_loggers(None::<PathBuf>);
        log::info!("logger initialized");
    }
}

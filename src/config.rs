use std::ffi::OsString;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde_derive::Deserialize;
use simplelog::LevelFilter;

use crate::error::{Error, Result};

static CONF: OnceCell<Configuration> = OnceCell::new();

/// Environment variable naming a TOML configuration file.
pub const CONFIG_FILE_VAR: &str = "HDFILE_CONFIG";
/// Prefix of the environment variables read when no configuration file is given.
pub const ENV_PREFIX: &str = "HDFILE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Local,
    Hdfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Settings for connecting a [`FileSystem`](crate::FileSystem) and for logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub backend: Backend,
    /// Namenode host; "default" picks up the cluster's `fs.defaultFS`.
    pub namenode: String,
    pub port: u16,
    /// Directory that backs the `local` backend.
    pub local_root: PathBuf,
    /// Zero keeps the client default for each of these.
    pub buffer_size: i32,
    pub replication: i16,
    pub block_size: i64,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            backend: Backend::Memory,
            namenode: "default".to_owned(),
            port: 9000,
            local_root: std::env::temp_dir().join("hdfile"),
            buffer_size: 0,
            replication: 0,
            block_size: 0,
            log_level: LogLevel::Info,
            log_file: None,
        }
    }
}

impl Configuration {
    /// Process-wide configuration, loaded on first use. A load error is returned and the
    /// next call tries again.
    pub fn try_get() -> Result<&'static Configuration> {
        CONF.get_or_try_init(Self::load)
    }

    /// Like [`try_get`](Self::try_get), but falls back to the defaults. The error goes to
    /// stderr since no logger is installed yet.
    pub fn get() -> &'static Configuration {
        CONF.get_or_init(|| {
            Self::load().unwrap_or_else(|err| {
                eprintln!("failed to load configuration, using defaults: {}", err);
                Configuration::default()
            })
        })
    }

    fn load() -> Result<Self> {
        Self::load_with(std::env::var_os(CONFIG_FILE_VAR))
    }

    fn load_with(config_file: Option<OsString>) -> Result<Self> {
        match config_file {
            Some(path) => Configuration::load_from(PathBuf::from(path)),
            None => Configuration::from_env(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Configuration>()?)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(&path).map_err(|e| Error::LoadConfig {
            source: e,
            path: path.as_ref().into(),
        })?;
        toml::from_str(&s).map_err(|e| Error::ParseConfig {
            source: e,
            path: path.as_ref().into(),
        })
    }
}

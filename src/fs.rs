//! A filesystem connection that hands out [`RemoteFileHandle`]s.
use std::sync::Arc;

use crate::config::{Backend, Configuration};
use crate::error::{Error, Result};
use crate::file::RemoteFileHandle;
use crate::local::LocalClient;
use crate::memory::MemoryClient;
use crate::native::{NativeClient, OpenFlags, OpenMode};

#[derive(Clone)]
pub struct FileSystem {
    client: Arc<dyn NativeClient>,
    defaults: OpenFlags,
}

impl FileSystem {
    pub fn new(client: Arc<dyn NativeClient>) -> Self {
        FileSystem {
            client,
            defaults: OpenFlags::new(OpenMode::Read),
        }
    }

    /// Connects to the backend named by `conf`, using its buffer size, replication and
    /// block size for every file opened later.
    pub fn connect(conf: &Configuration) -> Result<Self> {
        let client: Arc<dyn NativeClient> = match conf.backend {
            Backend::Memory => Arc::new(MemoryClient::new()),
            Backend::Local => match LocalClient::new(&conf.local_root) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    log::error!("cannot use {} as local root: {}", conf.local_root.display(), e);
                    return Err(Error::Connect(conf.local_root.display().to_string()));
                }
            },
            Backend::Hdfs => connect_hdfs(conf)?,
        };
        log::info!("filesystem connected using {:?} backend", conf.backend);
        let mut fs = FileSystem::new(client);
        fs.defaults.buffer_size = conf.buffer_size;
        fs.defaults.replication = conf.replication;
        fs.defaults.block_size = conf.block_size;
        Ok(fs)
    }

    pub fn client(&self) -> &Arc<dyn NativeClient> {
        &self.client
    }

    pub fn open(&self, path: &str) -> Result<RemoteFileHandle> {
        self.open_mode(path, OpenMode::Read)
    }

    /// Creates `path`, replacing any existing contents.
    pub fn create(&self, path: &str) -> Result<RemoteFileHandle> {
        self.open_mode(path, OpenMode::Write)
    }

    pub fn append(&self, path: &str) -> Result<RemoteFileHandle> {
        self.open_mode(path, OpenMode::Append)
    }

    fn open_mode(&self, path: &str, mode: OpenMode) -> Result<RemoteFileHandle> {
        let flags = OpenFlags {
            mode,
            ..self.defaults
        };
        self.open_with(path, flags)
    }

    pub fn open_with(&self, path: &str, flags: OpenFlags) -> Result<RemoteFileHandle> {
        match self.client.open_file(path, &flags) {
            Some(raw) => {
                log::debug!("opened {} for {:?}", path, flags.mode);
                Ok(RemoteFileHandle::new(
                    self.client.clone(),
                    raw,
                    path.to_owned(),
                    flags.mode,
                ))
            }
            None => {
                let detail = self
                    .client
                    .last_error()
                    .unwrap_or_else(|| "open failed".to_owned());
                Err(Error::Open {
                    path: path.to_owned(),
                    mode: flags.mode,
                    detail,
                })
            }
        }
    }
}

#[cfg(feature = "hdrs_valid")]
fn connect_hdfs(conf: &Configuration) -> Result<Arc<dyn NativeClient>> {
    let client = crate::hdfs::HdfsClient::connect(&conf.namenode, conf.port)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "hdrs_valid"))]
fn connect_hdfs(conf: &Configuration) -> Result<Arc<dyn NativeClient>> {
    log::error!("hdfs backend requested but built without the `hdrs_valid` feature");
    Err(Error::Connect(format!("{}:{}", conf.namenode, conf.port)))
}

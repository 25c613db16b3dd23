//! File dispatcher - appends JSON lines
//!
//! `file:///var/lib/tally/samples.jsonl` appends one JSON document per
//! item. The file and its parent directory are created on first use.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tally_config::SinkConfig;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{Batch, DeliveryError, Dispatcher, DispatcherFactory, Result, SinkError};

/// Dispatcher appending to a local file
pub struct FileDispatcher {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path).await
    }
}

#[async_trait]
impl Dispatcher for FileDispatcher {
    async fn connect(&self) -> std::result::Result<(), DeliveryError> {
        let file = self.open().await?;
        *self.file.lock().await = Some(file);
        Ok(())
    }

    async fn write(&self, batch: &Batch) -> std::result::Result<(), DeliveryError> {
        let mut buf = Vec::with_capacity(batch.len() * 256);
        for datum in batch.items() {
            serde_json::to_writer(&mut buf, datum).map_err(|e| DeliveryError::permanent(e.to_string()))?;
            buf.push(b'\n');
        }

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(DeliveryError::transient("file unavailable"));
        };

        let written = match file.write_all(&buf).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            *guard = None;
            return Err(e.into());
        }
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        "file"
    }
}

/// Factory for `file://<path>`
pub struct FileFactory;

impl DispatcherFactory for FileFactory {
    fn create(&self, sink: &str, config: &SinkConfig) -> Result<Arc<dyn Dispatcher>> {
        let path = config.target();
        if path.is_empty() {
            return Err(SinkError::config(sink, "file url needs a path, e.g. file:///tmp/out.jsonl"));
        }
        Ok(Arc::new(FileDispatcher::new(path)))
    }

    fn scheme(&self) -> &'static str {
        "file"
    }
}

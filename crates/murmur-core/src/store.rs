//! Store, the single owner of the persisted [`Document`].
//!
//! Every read and every read-modify-write sequence runs under one async
//! mutex. Mutations are applied to a draft copy, the draft is flushed to
//! disk, and only then does it replace the live document, so a failed flush
//! leaves both disk and memory at the previous state.
//!
//! Flushes write `<path>.tmp` and rename it over the document.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::types::Document;

/// Cheaply cloneable handle to the shared document.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    document: Mutex<Document>,
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    File { path: PathBuf, io_timeout: Duration },
    Memory,
}

impl Store {
    /// Load the document at `path`, creating it with empty defaults if it
    /// does not exist yet.
    pub async fn open(path: impl Into<PathBuf>, io_timeout: Duration) -> Result<Self, StorageError> {
        let path = path.into();
        let backing = Backing::File {
            path: path.clone(),
            io_timeout,
        };

        let existing = with_timeout(&path, io_timeout, async {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(StorageError::Io {
                    path: path.clone(),
                    source,
                }),
            }
        })
        .await?;

        let document = match existing {
            Some(bytes) => {
                let document: Document =
                    serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                info!(
                    path = %path.display(),
                    records = document.feedback.len(),
                    "loaded feedback store"
                );
                document
            }
            None => {
                let document = Document::default();
                backing.flush(&document).await?;
                info!(path = %path.display(), "created empty feedback store");
                document
            }
        };

        Ok(Self::with_backing(document, backing))
    }

    /// A store with no backing file. Flushes are no-ops.
    pub fn in_memory() -> Self {
        Self::from_document(Document::default())
    }

    /// An in-memory store seeded with `document`.
    pub fn from_document(document: Document) -> Self {
        Self::with_backing(document, Backing::Memory)
    }

    fn with_backing(document: Document, backing: Backing) -> Self {
        Self {
            inner: Arc::new(Inner {
                document: Mutex::new(document),
                backing,
            }),
        }
    }

    /// Run `f` against the current document.
    pub async fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        let document = self.inner.document.lock().await;
        f(&document)
    }

    /// Hold the document lock, stalling every other store operation.
    #[cfg(test)]
    pub(crate) async fn hold(&self) -> tokio::sync::MutexGuard<'_, Document> {
        self.inner.document.lock().await
    }

    /// Copy of the whole document.
    pub async fn snapshot(&self) -> Document {
        self.read(Document::clone).await
    }

    /// Apply `f` to the document and flush it.
    ///
    /// If `f` fails nothing is written. If the flush fails the in-memory
    /// document is left untouched and the storage error is returned.
    pub async fn mutate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut document = self.inner.document.lock().await;
        let mut draft = document.clone();
        let out = f(&mut draft)?;
        self.inner.backing.flush(&draft).await?;
        *document = draft;
        Ok(out)
    }
}

impl Backing {
    async fn flush(&self, document: &Document) -> Result<(), StorageError> {
        let Backing::File { path, io_timeout } = self else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = tmp_path(path);

        with_timeout(path, *io_timeout, async {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| io_error(parent, source))?;
            }
            tokio::fs::write(&tmp, &bytes)
                .await
                .map_err(|source| io_error(&tmp, source))?;
            tokio::fs::rename(&tmp, path)
                .await
                .map_err(|source| io_error(path, source))
        })
        .await?;

        debug!(path = %path.display(), bytes = bytes.len(), "flushed feedback store");
        Ok(())
    }
}

async fn with_timeout<T>(
    path: &Path,
    timeout: Duration,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StorageError::Timeout {
            path: path.to_path_buf(),
            timeout,
        })?
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

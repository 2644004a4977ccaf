//! Media ingestion: uploaded files are streamed under the media root and
//! addressed by `<url prefix>/<file name>` references.

use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use bytes::Bytes;
use futures::future::try_join_all;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("file {0:?} submitted more than once")]
    DuplicateName(String),
    #[error("media root {root}: {source}")]
    Root { root: String, source: std::io::Error },
    #[error("failed to write {name}: {source}")]
    Write { name: String, source: std::io::Error },
}

impl MediaError {
    /// Whether the failure stems from the submitted files rather than storage.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MediaError::InvalidName(_) | MediaError::DuplicateName(_))
    }
}

/// An uploaded file: its declared name and a byte stream.
pub struct Upload {
    name: String,
    body: Pin<Box<dyn AsyncRead + Send>>,
}

impl Upload {
    pub fn new(name: impl Into<String>, body: impl AsyncRead + Send + 'static) -> Self {
        Self { name: name.into(), body: Box::pin(body) }
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, Cursor::new(data.into()))
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Keep only the final path component of a declared name.
fn sanitize(declared: &str) -> Result<String, MediaError> {
    let name = Path::new(declared)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(MediaError::InvalidName(declared.to_owned()));
    }
    Ok(name.to_owned())
}

struct Staged {
    name: String,
    temp: PathBuf,
}

/// Outcome of one [`MediaStore::ingest`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ingested {
    references: Vec<String>,
    created: Vec<String>,
}

impl Ingested {
    /// Every stored reference, in submission order.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// References whose file did not exist before the call.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn into_references(self) -> Vec<String> {
        self.references
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %err, "could not remove staged media file");
        }
    }
}

#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self { root: root.into(), url_prefix: url_prefix.trim_matches('/').to_owned() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn reference(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// On-disk location of a reference produced by this store.
    pub fn locate(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(self.url_prefix.as_str())?.strip_prefix('/')?;
        let clean = sanitize(name).ok()?;
        (clean == name).then(|| self.root.join(clean))
    }

    /// Write every upload concurrently and return their references in input order.
    ///
    /// Uploads are streamed to hidden staging files and renamed into place
    /// only once every write has finished. The first failing write fails the
    /// whole call: in-flight siblings are dropped, staging files removed, and
    /// nothing under a final name is touched. Names are checked before
    /// anything touches the disk.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn ingest(&self, files: Vec<Upload>) -> Result<Ingested, MediaError> {
        if files.is_empty() {
            return Ok(Ingested::default());
        }

        let mut seen = HashSet::with_capacity(files.len());
        let mut names = Vec::with_capacity(files.len());
        for upload in &files {
            let name = sanitize(upload.file_name())?;
            if !seen.insert(name.clone()) {
                return Err(MediaError::DuplicateName(name));
            }
            names.push(name);
        }

        fs::create_dir_all(&self.root).await.map_err(|source| MediaError::Root {
            root: self.root.display().to_string(),
            source,
        })?;

        let staging = Mutex::new(Vec::with_capacity(files.len()));
        let writes = files
            .into_iter()
            .zip(names)
            .map(|(upload, name)| self.stage(upload, name, &staging));

        match try_join_all(writes).await {
            Ok(staged) => self.publish(staged).await,
            Err(e) => {
                let leftovers = staging.lock().map(|mut paths| std::mem::take(&mut *paths)).unwrap_or_default();
                warn!(error = %e, removing = leftovers.len(), "media ingestion failed");
                remove_all(&leftovers).await;
                Err(e)
            }
        }
    }

    async fn stage(&self, mut upload: Upload, name: String, staging: &Mutex<Vec<PathBuf>>) -> Result<Staged, MediaError> {
        let temp = self.root.join(format!(".{}.{}.part", name, Uuid::new_v4().simple()));
        let fail = |source| MediaError::Write { name: name.clone(), source };

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await
            .map_err(fail)?;
        if let Ok(mut paths) = staging.lock() {
            paths.push(temp.clone());
        }
        let bytes = tokio::io::copy(&mut upload.body, &mut file).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;

        debug!(file = %name, bytes, "media file staged");
        Ok(Staged { name, temp })
    }

    /// Move staged files to their final names. A name that already existed is
    /// replaced in place and never reported as created.
    async fn publish(&self, staged: Vec<Staged>) -> Result<Ingested, MediaError> {
        let mut out = Ingested::default();
        let mut pending = staged.into_iter();
        while let Some(part) = pending.next() {
            let target = self.root.join(&part.name);
            let existed = fs::try_exists(&target).await.unwrap_or(true);
            if let Err(source) = fs::rename(&part.temp, &target).await {
                let mut leftovers = vec![part.temp];
                leftovers.extend(pending.map(|p| p.temp));
                warn!(file = %part.name, error = %source, "could not move staged media into place");
                remove_all(&leftovers).await;
                self.discard(&out.created).await;
                return Err(MediaError::Write { name: part.name, source });
            }
            let reference = self.reference(&part.name);
            if !existed {
                out.created.push(reference.clone());
            }
            out.references.push(reference);
        }
        info!(count = out.references.len(), created = out.created.len(), "media ingested");
        Ok(out)
    }

    /// Best-effort removal of files whose owning write was abandoned.
    /// Callers pass [`Ingested::created`], never references a saved row may hold.
    pub async fn discard(&self, references: &[String]) {
        for reference in references {
            let Some(path) = self.locate(reference) else { continue };
            match fs::remove_file(&path).await {
                Ok(()) => debug!(%reference, "media discarded"),
                Err(e) => warn!(%reference, error = %e, "could not discard media"),
            }
        }
    }
}

//! "Save as" side channel for response bodies.
//!
//! [`XResponse::download`](crate::XResponse::download) registers the body as
//! an object URL with a [`DownloadHost`], then activates a transient hidden
//! [`Anchor`] pointing at it. What activation means is up to the host; the
//! bundled [`FsDownloadHost`] writes the blob into a directory.
//!
//! # Example
//!
//! ```no_run
//! use xrequest::{FsDownloadHost, XRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let host = FsDownloadHost::new("./downloads");
//! let mut response = XRequest::new()
//!     .url("https://example.com/report")
//!     .execute()
//!     .await?;
//! response.download(&host)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod filename;

pub use error::DownloadError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::transport::Blob;
use filename::resolve_unique_path;

/// Transient link element used to trigger a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    /// Suggested filename.
    pub download: String,
    pub target: String,
    pub hidden: bool,
}

impl Anchor {
    /// A hidden anchor opening in a new browsing context.
    pub fn new(href: impl Into<String>, download: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            download: download.into(),
            target: "_blank".to_string(),
            hidden: true,
        }
    }
}

/// Host environment capability for object URLs and download activation.
pub trait DownloadHost {
    /// Registers `blob` and returns a URL referring to it.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the host cannot register the blob.
    fn create_object_url(&self, blob: &Blob) -> Result<String, DownloadError>;

    /// Attaches `anchor`, activates it and removes it again.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the target cannot be resolved or saved.
    fn activate(&self, anchor: &Anchor) -> Result<(), DownloadError>;
}

/// Download host that saves activated anchors as files in a directory.
#[derive(Debug)]
pub struct FsDownloadHost {
    dir: PathBuf,
    blobs: Mutex<HashMap<String, Blob>>,
    saved: Mutex<Vec<PathBuf>>,
}

impl FsDownloadHost {
    /// Creates a host saving into `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            blobs: Mutex::new(HashMap::new()),
            saved: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in save order.
    #[must_use]
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        lock(&self.saved).clone()
    }

    /// Forgets an object URL. Returns whether it was registered.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        lock(&self.blobs).remove(url).is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DownloadHost for FsDownloadHost {
    fn create_object_url(&self, blob: &Blob) -> Result<String, DownloadError> {
        let url = format!("blob:xrequest/{:016x}", rand::random::<u64>());
        debug!(url = %url, bytes = blob.len(), "object URL created");
        lock(&self.blobs).insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn activate(&self, anchor: &Anchor) -> Result<(), DownloadError> {
        let bytes = lock(&self.blobs)
            .get(&anchor.href)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| DownloadError::unknown_object_url(&anchor.href))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| DownloadError::io(&self.dir, e))?;
        let path = resolve_unique_path(&self.dir, &anchor.download);
        std::fs::write(&path, bytes).map_err(|e| DownloadError::io(&path, e))?;

        info!(path = %path.display(), "download saved");
        lock(&self.saved).push(path);
        Ok(())
    }
}

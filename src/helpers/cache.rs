//! Content cache - downloads keyed by URL file name.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/archives/   downloaded source archives
//! <root>/snapshots/  repository snapshots, local and from the mirror
//! ```

use std::path::{Path, PathBuf};

use crate::core::output;
use crate::descriptor::Integrity;
use crate::error::FetchError;

use super::ContentCache;
use super::hash::verify_file;
use super::http::{HttpClient, url_filename};

/// Content cache rooted at a directory.
#[derive(Clone)]
pub struct DirCache {
    root: PathBuf,
    http: HttpClient,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>, http: HttpClient) -> Self {
        Self {
            root: root.into(),
            http,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentCache for DirCache {
    /// Download `url` into `dir`, reusing a cached copy that passes `integrity`.
    ///
    /// The body goes to a temporary file next to its final name and is only
    /// moved into place after verification, so a failed or corrupt download
    /// never leaves a cache entry behind.
    fn download_file(
        &self,
        url: &str,
        dir: &Path,
        integrity: &Integrity,
        user_agent: Option<&str>,
    ) -> Result<PathBuf, FetchError> {
        let filename = url_filename(url).ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
        std::fs::create_dir_all(dir)?;
        let dest = dir.join(&filename);

        if dest.is_file() {
            match verify_file(&dest, integrity) {
                Ok(()) => {
                    output::detail(&format!("using cached {}", filename));
                    return Ok(dest);
                }
                Err(e) => output::warning(&format!(
                    "cached {} does not verify, downloading again: {}",
                    filename, e
                )),
            }
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dir)?;
        let bytes = self
            .http
            .download_to(url, tmp.as_file_mut(), user_agent, &filename)?;
        verify_file(tmp.path(), integrity)?;
        tmp.persist(&dest).map_err(|e| FetchError::Io(e.error))?;

        output::detail(&format!("downloaded {} ({} bytes)", filename, bytes));
        Ok(dest)
    }

    fn archive_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    fn snapshot_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }
}

//! Fallback mirror transport.

use std::path::Path;

use crate::core::output;
use crate::error::FetchError;

use super::http::HttpClient;
use super::{ArchiveCodec, FallbackTransport, NativeCodec};

/// Fetches `<mirror>/<artifact>` over HTTP and extracts it with a codec.
#[derive(Clone)]
pub struct HttpMirror<C = NativeCodec> {
    http: HttpClient,
    codec: C,
}

impl<C: ArchiveCodec> HttpMirror<C> {
    pub fn new(http: HttpClient, codec: C) -> Self {
        Self { http, codec }
    }
}

/// Join a mirror base URL and an artifact name with exactly one slash.
pub fn artifact_url(mirror_url: &str, artifact: &str) -> String {
    format!(
        "{}/{}",
        mirror_url.trim_end_matches('/'),
        artifact.trim_start_matches('/')
    )
}

impl<C: ArchiveCodec> FallbackTransport for HttpMirror<C> {
    /// Download into `download_dir/<artifact>`, then replace `dest_dir` with
    /// the extracted content.
    fn fetch_and_extract(
        &self,
        mirror_url: &str,
        artifact: &str,
        download_dir: &Path,
        dest_dir: &Path,
    ) -> Result<(), FetchError> {
        let url = artifact_url(mirror_url, artifact);
        std::fs::create_dir_all(download_dir)?;
        let local = download_dir.join(artifact);

        let mut tmp = tempfile::Builder::new()
            .prefix(".mirror-")
            .tempfile_in(download_dir)?;
        self.http
            .download_to(&url, tmp.as_file_mut(), None, artifact)?;
        tmp.persist(&local).map_err(|e| FetchError::Io(e.error))?;
        output::detail(&format!("fetched {} from mirror", artifact));

        if dest_dir.exists() {
            std::fs::remove_dir_all(dest_dir)?;
        }
        self.codec.extract(&local, dest_dir)?;
        Ok(())
    }
}

//! Orchestrator configuration, fixed at construction.

use std::path::PathBuf;

/// How the mirror artifact is named when an archive download fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackArtifact {
    /// Base name of the downloaded file. Empty when the download itself
    /// failed, in which case the mirror is not asked at all.
    #[default]
    DownloadedName,
    /// Last path segment of the source URL, whether or not the download worked.
    UrlName,
}

/// Explicit configuration for one [`Bootstrapper`](super::Bootstrapper).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Root that relative patch files are resolved against
    pub postprocessing_dir: Option<PathBuf>,
    /// Write a snapshot archive after each repository checkout
    pub create_snapshots: bool,
    /// Base URL of the fallback mirror
    pub fallback_url: Option<String>,
    pub fallback_artifact: FallbackArtifact,
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the postprocessing root.
    pub fn postprocessing_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.postprocessing_dir = Some(dir.into());
        self
    }

    /// Enable or disable snapshot creation.
    pub fn create_snapshots(mut self, create: bool) -> Self {
        self.create_snapshots = create;
        self
    }

    /// Set the fallback mirror. An empty URL leaves the mirror unconfigured.
    pub fn fallback_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.fallback_url = (!url.is_empty()).then_some(url);
        self
    }

    pub fn fallback_artifact(mut self, artifact: FallbackArtifact) -> Self {
        self.fallback_artifact = artifact;
        self
    }

    /// The mirror URL, if one is configured.
    pub fn mirror(&self) -> Option<&str> {
        self.fallback_url.as_deref().filter(|u| !u.is_empty())
    }
}

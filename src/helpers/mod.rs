//! Leaf collaborators of the bootstrap orchestrator.
//!
//! Each concern is a trait so the orchestrator can be driven by fakes in
//! tests; the `SystemTools` bundle wires up the real implementations:
//!
//! - **archive**: [`ArchiveCodec`] over tar/gz/xz/bz2/zst/zip
//! - **cache**: [`ContentCache`] rooted at a cache directory
//! - **vcs**: [`VcsAdapter`] running `git`, `hg` and `svn`
//! - **mirror**: [`FallbackTransport`] fetching artifacts from a mirror
//! - **post**: [`PostRunner`] running `patch` and scripts
//!
//! `hash`, `http` and `progress` are internal utilities shared by the above.

pub mod archive;
pub mod cache;
pub mod hash;
pub mod http;
pub mod mirror;
pub mod post;
pub mod progress;
pub mod vcs;

use std::path::{Path, PathBuf};

use crate::descriptor::{Integrity, VcsKind};
use crate::error::{ArchiveError, FetchError, PostprocessError, VcsError};

pub use archive::NativeCodec;
pub use cache::DirCache;
pub use http::HttpClient;
pub use mirror::HttpMirror;
pub use post::CommandRunner;
pub use vcs::CommandVcs;

/// Extracts archives and creates snapshot archives.
pub trait ArchiveCodec {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError>;

    fn create_from_directory(
        &self,
        src: &Path,
        archive: &Path,
        mark_latest: bool,
    ) -> Result<(), ArchiveError>;
}

/// Downloads into cache directories and names the two cache namespaces.
pub trait ContentCache {
    /// Download `url` into `dir`, returning the local file.
    fn download_file(
        &self,
        url: &str,
        dir: &Path,
        integrity: &Integrity,
        user_agent: Option<&str>,
    ) -> Result<PathBuf, FetchError>;

    fn archive_dir(&self) -> PathBuf;

    fn snapshot_dir(&self) -> PathBuf;
}

/// One `update_state` call. `url: None` means "derive from the working copy
/// already in `dest`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcsRequest<'a> {
    pub kind: VcsKind,
    pub url: Option<&'a str>,
    pub name: &'a str,
    pub dest: &'a Path,
    pub branch: Option<&'a str>,
    pub revision: Option<&'a str>,
}

pub trait VcsAdapter {
    fn update_state(&self, request: &VcsRequest<'_>) -> Result<(), VcsError>;
}

/// Fetches a named artifact from a mirror and extracts it.
pub trait FallbackTransport {
    fn fetch_and_extract(
        &self,
        mirror_url: &str,
        artifact: &str,
        download_dir: &Path,
        dest_dir: &Path,
    ) -> Result<(), FetchError>;
}

/// Applies patches and runs postprocessing scripts.
pub trait PostRunner {
    fn apply_patch(
        &self,
        name: &str,
        dir: &Path,
        patch: &Path,
        pnum: u32,
    ) -> Result<(), PostprocessError>;

    fn run_script(&self, script: &Path) -> Result<(), PostprocessError>;
}

/// Borrowed set of collaborators handed to the orchestrator.
#[derive(Clone, Copy)]
pub struct Toolset<'a> {
    pub codec: &'a dyn ArchiveCodec,
    pub cache: &'a dyn ContentCache,
    pub vcs: &'a dyn VcsAdapter,
    pub mirror: &'a dyn FallbackTransport,
    pub runner: &'a dyn PostRunner,
}

/// The real collaborators, owned.
pub struct SystemTools {
    pub codec: NativeCodec,
    pub cache: DirCache,
    pub vcs: CommandVcs,
    pub mirror: HttpMirror,
    pub runner: CommandRunner,
}

impl SystemTools {
    pub fn new(cache_root: impl Into<PathBuf>, http: HttpClient) -> Self {
        Self {
            codec: NativeCodec,
            cache: DirCache::new(cache_root, http.clone()),
            vcs: CommandVcs,
            mirror: HttpMirror::new(http, NativeCodec),
            runner: CommandRunner,
        }
    }

    pub fn toolset(&self) -> Toolset<'_> {
        Toolset {
            codec: &self.codec,
            cache: &self.cache,
            vcs: &self.vcs,
            mirror: &self.mirror,
            runner: &self.runner,
        }
    }
}

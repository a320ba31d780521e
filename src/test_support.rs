//! Recording fakes for the orchestrator collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::bootstrap::{BootstrapConfig, BootstrapReport, Bootstrapper};
use crate::descriptor::{Integrity, LibraryDescriptor, VcsKind};
use crate::error::{ArchiveError, FetchError, PostprocessError, VcsError};
use crate::helpers::{
    ArchiveCodec, ContentCache, FallbackTransport, PostRunner, Toolset, VcsAdapter, VcsRequest,
};

pub(crate) struct FakeCache {
    pub(crate) root: PathBuf,
    pub(crate) fail: Cell<bool>,
    pub(crate) calls: RefCell<Vec<(String, PathBuf, Integrity, Option<String>)>>,
}

impl ContentCache for FakeCache {
    fn download_file(
        &self,
        url: &str,
        dir: &Path,
        integrity: &Integrity,
        user_agent: Option<&str>,
    ) -> Result<PathBuf, FetchError> {
        self.calls.borrow_mut().push((
            url.to_string(),
            dir.to_path_buf(),
            integrity.clone(),
            user_agent.map(str::to_string),
        ));
        if self.fail.get() {
            return Err(FetchError::Status {
                url: url.to_string(),
                code: 404,
            });
        }
        std::fs::create_dir_all(dir).unwrap();
        let file = dir.join("foo-1.0.tar.gz");
        std::fs::write(&file, b"archive").unwrap();
        Ok(file)
    }

    fn archive_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    fn snapshot_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }
}

#[derive(Default)]
pub(crate) struct FakeCodec {
    pub(crate) fail_extract: Cell<bool>,
    pub(crate) fail_snapshot: Cell<bool>,
    pub(crate) extracts: RefCell<Vec<(PathBuf, PathBuf)>>,
    pub(crate) snapshots: RefCell<Vec<(PathBuf, PathBuf, bool)>>,
}

impl ArchiveCodec for FakeCodec {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        self.extracts
            .borrow_mut()
            .push((archive.to_path_buf(), dest.to_path_buf()));
        if self.fail_extract.get() {
            return Err(ArchiveError::Corrupt {
                path: archive.to_path_buf(),
                message: "truncated".into(),
            });
        }
        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(dest.join("extracted"), b"new").unwrap();
        Ok(())
    }

    fn create_from_directory(
        &self,
        src: &Path,
        archive: &Path,
        mark_latest: bool,
    ) -> Result<(), ArchiveError> {
        self.snapshots
            .borrow_mut()
            .push((src.to_path_buf(), archive.to_path_buf(), mark_latest));
        if self.fail_snapshot.get() {
            return Err(ArchiveError::Io {
                path: archive.to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        std::fs::create_dir_all(archive.parent().unwrap()).unwrap();
        std::fs::write(archive, b"snapshot").unwrap();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VcsCall {
    pub(crate) kind: VcsKind,
    pub(crate) url: Option<String>,
    pub(crate) dest: PathBuf,
    pub(crate) branch: Option<String>,
    pub(crate) revision: Option<String>,
}

/// Answers `update_state` calls from a queue; an empty queue means success.
#[derive(Default)]
pub(crate) struct FakeVcs {
    pub(crate) results: RefCell<VecDeque<bool>>,
    pub(crate) calls: RefCell<Vec<VcsCall>>,
}

impl FakeVcs {
    pub(crate) fn answers(&self, results: &[bool]) {
        self.results.borrow_mut().extend(results.iter().copied());
    }
}

impl VcsAdapter for FakeVcs {
    fn update_state(&self, request: &VcsRequest<'_>) -> Result<(), VcsError> {
        self.calls.borrow_mut().push(VcsCall {
            kind: request.kind,
            url: request.url.map(str::to_string),
            dest: request.dest.to_path_buf(),
            branch: request.branch.map(str::to_string),
            revision: request.revision.map(str::to_string),
        });
        if self.results.borrow_mut().pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(VcsError::CommandFailed {
                tool: request.kind.tool(),
                operation: "clone".into(),
                stderr: "could not resolve host".into(),
            })
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeMirror {
    pub(crate) fail: Cell<bool>,
    pub(crate) calls: RefCell<Vec<(String, String, PathBuf, PathBuf)>>,
}

impl FallbackTransport for FakeMirror {
    fn fetch_and_extract(
        &self,
        mirror_url: &str,
        artifact: &str,
        download_dir: &Path,
        dest_dir: &Path,
    ) -> Result<(), FetchError> {
        self.calls.borrow_mut().push((
            mirror_url.to_string(),
            artifact.to_string(),
            download_dir.to_path_buf(),
            dest_dir.to_path_buf(),
        ));
        if self.fail.get() {
            return Err(FetchError::Status {
                url: format!("{}/{}", mirror_url, artifact),
                code: 404,
            });
        }
        std::fs::create_dir_all(dest_dir).unwrap();
        std::fs::write(dest_dir.join("from-mirror"), b"mirror").unwrap();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRunner {
    pub(crate) fail: Cell<bool>,
    pub(crate) patches: RefCell<Vec<(String, PathBuf, PathBuf, u32)>>,
    pub(crate) scripts: RefCell<Vec<PathBuf>>,
}

impl PostRunner for FakeRunner {
    fn apply_patch(
        &self,
        name: &str,
        dir: &Path,
        patch: &Path,
        pnum: u32,
    ) -> Result<(), PostprocessError> {
        self.patches.borrow_mut().push((
            name.to_string(),
            dir.to_path_buf(),
            patch.to_path_buf(),
            pnum,
        ));
        if self.fail.get() {
            return Err(PostprocessError::PatchFailed {
                file: patch.to_path_buf(),
                code: Some(1),
                stderr: "hunk FAILED".into(),
            });
        }
        Ok(())
    }

    fn run_script(&self, script: &Path) -> Result<(), PostprocessError> {
        self.scripts.borrow_mut().push(script.to_path_buf());
        if self.fail.get() {
            return Err(PostprocessError::ScriptFailed {
                file: script.to_path_buf(),
                code: Some(2),
            });
        }
        Ok(())
    }
}

pub(crate) struct Fakes {
    pub(crate) tmp: TempDir,
    pub(crate) cache: FakeCache,
    pub(crate) codec: FakeCodec,
    pub(crate) vcs: FakeVcs,
    pub(crate) mirror: FakeMirror,
    pub(crate) runner: FakeRunner,
}

impl Fakes {
    pub(crate) fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let cache = FakeCache {
            root: tmp.path().join("cache"),
            fail: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        };
        Self {
            tmp,
            cache,
            codec: FakeCodec::default(),
            vcs: FakeVcs::default(),
            mirror: FakeMirror::default(),
            runner: FakeRunner::default(),
        }
    }

    pub(crate) fn toolset(&self) -> Toolset<'_> {
        Toolset {
            codec: &self.codec,
            cache: &self.cache,
            vcs: &self.vcs,
            mirror: &self.mirror,
            runner: &self.runner,
        }
    }

    pub(crate) fn library_dir(&self) -> PathBuf {
        self.tmp.path().join("libs").join("libfoo")
    }

    pub(crate) fn run(&self, config: BootstrapConfig, descriptor: &LibraryDescriptor) -> BootstrapReport {
        Bootstrapper::new(config, self.toolset()).bootstrap(descriptor, &self.library_dir())
    }

    pub(crate) fn nothing_fetched(&self) -> bool {
        self.cache.calls.borrow().is_empty()
            && self.vcs.calls.borrow().is_empty()
            && self.mirror.calls.borrow().is_empty()
    }
}

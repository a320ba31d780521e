//! Bootstrap orchestrator.
//!
//! A bootstrap is a small state machine:
//!
//! ```text
//! Validating ─┬─> AcquiringArchive ─┬──────────────────> Postprocessing ─> Done
//!             │                     └─> Recovering ──────┘      │
//!             └─> AcquiringRepo ────┬────────────────────┘      │
//!                                   └─> Recovering ─> (re-derive)┘
//! any state ─> Failed
//! ```
//!
//! Each state has one transition function taking the per-run state and
//! returning the next state, so transitions can be exercised one at a time
//! with [`Bootstrapper::step`].

mod archive;
mod context;
mod fallback;
mod postprocess;
mod report;
mod repository;


pub use context::{BootstrapConfig, FallbackArtifact};
pub use fallback::FallbackOutcome;
pub use report::{BootstrapEvent, BootstrapReport, Level, Run};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::descriptor::{ArchiveSource, LibraryDescriptor, RepoSource, SourceSpec};
use crate::error::BootstrapError;
use crate::helpers::Toolset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Validating,
    AcquiringArchive,
    AcquiringRepo,
    Recovering,
    Postprocessing,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::AcquiringArchive => "acquiring archive",
            Self::AcquiringRepo => "acquiring repository",
            Self::Recovering => "recovering",
            Self::Postprocessing => "postprocessing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where to continue after a successful recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Content is in place; go on to postprocessing
    Archive,
    /// Re-derive the working copy state without a URL first
    Repository(RepoSource),
}

/// Everything the `Recovering` state needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    /// Artifact name requested from the mirror
    pub artifact: String,
    /// Cache directory the artifact is downloaded into
    pub download_dir: PathBuf,
    /// Rendered primary failure
    pub primary: String,
    pub resume: Resume,
}

#[derive(Debug)]
pub enum State {
    Validating,
    AcquiringArchive(ArchiveSource),
    AcquiringRepo(RepoSource),
    Recovering(Recovery),
    Postprocessing,
    Done,
    Failed(BootstrapError),
}

impl State {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Validating => Phase::Validating,
            Self::AcquiringArchive(_) => Phase::AcquiringArchive,
            Self::AcquiringRepo(_) => Phase::AcquiringRepo,
            Self::Recovering(_) => Phase::Recovering,
            Self::Postprocessing => Phase::Postprocessing,
            Self::Done => Phase::Done,
            Self::Failed(_) => Phase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Sequences the collaborators for one library at a time.
pub struct Bootstrapper<'a> {
    config: BootstrapConfig,
    tools: Toolset<'a>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(config: BootstrapConfig, tools: Toolset<'a>) -> Self {
        Self { config, tools }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Bootstrap `descriptor` into `library_dir`.
    pub fn bootstrap(&self, descriptor: &LibraryDescriptor, library_dir: &Path) -> BootstrapReport {
        let mut run = Run::new(descriptor, library_dir);
        run.info(format!(
            "bootstrapping library '{}' to {}",
            descriptor.name,
            library_dir.display()
        ));

        let mut state = State::Validating;
        loop {
            state = match state {
                State::Done => return run.finish(None),
                State::Failed(error) => return run.finish(Some(error)),
                other => self.step(&mut run, other),
            };
        }
    }

    /// Run the transition function of `state`. Terminal states map to themselves.
    pub fn step(&self, run: &mut Run<'_>, state: State) -> State {
        if !state.is_terminal() {
            run.phase = state.phase();
        }
        match state {
            State::Validating => self.validate(run),
            State::AcquiringArchive(source) => self.acquire_archive(run, &source),
            State::AcquiringRepo(source) => self.acquire_repo(run, &source),
            State::Recovering(recovery) => self.recover(run, recovery),
            State::Postprocessing => self.postprocess(run),
            terminal => terminal,
        }
    }

    /// `Validating`: create the library directory and check the source shape.
    fn validate(&self, run: &mut Run<'_>) -> State {
        if let Err(source) = std::fs::create_dir_all(&run.library_dir) {
            run.error(format!(
                "cannot create directory {} for '{}': {}",
                run.library_dir.display(),
                run.name(),
                source
            ));
            return State::Failed(BootstrapError::LibraryDir {
                path: run.library_dir.clone(),
                source,
            });
        }

        match run.descriptor.validate_source() {
            Ok(SourceSpec::Archive(source)) => State::AcquiringArchive(source),
            Ok(SourceSpec::Repository(source)) => State::AcquiringRepo(source),
            Err(e) => {
                run.warning(format!("library '{}': {}", run.name(), e));
                State::Failed(e.into())
            }
        }
    }
}

//! Per-run state, event trail and the final report.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::output;
use crate::descriptor::LibraryDescriptor;
use crate::error::BootstrapError;

use super::{FallbackOutcome, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// One log line, tagged with the phase that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEvent {
    pub level: Level,
    pub phase: Phase,
    pub message: String,
}

impl fmt::Display for BootstrapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.level, self.phase, self.message)
    }
}

/// Mutable state of a single bootstrap, threaded through the transitions.
#[derive(Debug)]
pub struct Run<'d> {
    pub(super) descriptor: &'d LibraryDescriptor,
    pub(super) library_dir: PathBuf,
    pub(super) phase: Phase,
    pub(super) events: Vec<BootstrapEvent>,
    pub(super) fallback: Option<FallbackOutcome>,
    pub(super) snapshot: Option<PathBuf>,
}

impl<'d> Run<'d> {
    pub fn new(descriptor: &'d LibraryDescriptor, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            library_dir: library_dir.into(),
            phase: Phase::Validating,
            events: Vec::new(),
            fallback: None,
            snapshot: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn events(&self) -> &[BootstrapEvent] {
        &self.events
    }

    pub fn fallback(&self) -> Option<&FallbackOutcome> {
        self.fallback.as_ref()
    }

    fn record(&mut self, level: Level, message: String) {
        self.events.push(BootstrapEvent {
            level,
            phase: self.phase,
            message,
        });
    }

    pub(super) fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        output::info(&message);
        self.record(Level::Info, message);
    }

    pub(super) fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        output::warning(&message);
        self.record(Level::Warning, message);
    }

    pub(super) fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        output::error(&message);
        self.record(Level::Error, message);
    }

    pub(super) fn finish(self, error: Option<BootstrapError>) -> BootstrapReport {
        let (phase, failed_in) = match error {
            Some(_) => (Phase::Failed, Some(self.phase)),
            None => (Phase::Done, None),
        };
        BootstrapReport {
            name: self.descriptor.name.clone(),
            phase,
            failed_in,
            error,
            fallback: self.fallback,
            snapshot: self.snapshot,
            events: self.events,
        }
    }
}

/// Outcome of one library bootstrap.
#[derive(Debug)]
pub struct BootstrapReport {
    pub name: String,
    /// `Done` or `Failed`
    pub phase: Phase,
    /// Phase that was running when the failure happened
    pub failed_in: Option<Phase>,
    pub error: Option<BootstrapError>,
    /// Set whenever the fallback coordinator ran
    pub fallback: Option<FallbackOutcome>,
    /// Snapshot archive written by this run
    pub snapshot: Option<PathBuf>,
    pub events: Vec<BootstrapEvent>,
}

impl BootstrapReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> impl Iterator<Item = &str> {
        self.events
            .iter()
            .filter(move |e| e.level == level)
            .map(|e| e.message.as_str())
    }
}

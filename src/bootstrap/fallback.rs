//! Fallback coordinator - recovery through the secondary mirror.

use std::fmt;

use super::{Bootstrapper, Recovery, Resume, Run, State};
use crate::error::BootstrapError;

/// What happened when the mirror was consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// No mirror URL configured
    NotConfigured,
    /// A mirror exists but there was nothing sensible to ask it for
    NotAttempted(String),
    AttemptedFailed(String),
    Succeeded,
}

impl FallbackOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether the mirror was actually contacted.
    pub fn attempted(&self) -> bool {
        matches!(self, Self::AttemptedFailed(_) | Self::Succeeded)
    }
}

impl fmt::Display for FallbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "no fallback URL configured"),
            Self::NotAttempted(reason) => write!(f, "not attempted ({})", reason),
            Self::AttemptedFailed(reason) => write!(f, "download from fallback URL failed: {}", reason),
            Self::Succeeded => write!(f, "recovered from fallback URL"),
        }
    }
}

impl Bootstrapper<'_> {
    /// `Recovering`: fetch the artifact from the mirror into the library
    /// directory, then resume where the primary path left off.
    pub(super) fn recover(&self, run: &mut Run<'_>, recovery: Recovery) -> State {
        let outcome = self.consult_mirror(run, &recovery);
        run.fallback = Some(outcome.clone());

        if !outcome.succeeded() {
            return State::Failed(BootstrapError::Unrecovered {
                primary: recovery.primary,
                fallback: outcome,
            });
        }

        match recovery.resume {
            Resume::Archive => State::Postprocessing,
            Resume::Repository(source) => self.rederive(run, &source),
        }
    }

    fn consult_mirror(&self, run: &mut Run<'_>, recovery: &Recovery) -> FallbackOutcome {
        let Some(mirror) = self.config.mirror() else {
            run.warning(format!(
                "no fallback URL configured, cannot recover '{}'",
                run.name()
            ));
            return FallbackOutcome::NotConfigured;
        };

        if recovery.artifact.is_empty() {
            let reason = "no artifact name to request".to_string();
            run.warning(format!(
                "fallback for '{}' not attempted: {}",
                run.name(),
                reason
            ));
            return FallbackOutcome::NotAttempted(reason);
        }

        run.info(format!(
            "downloading {} from fallback URL {}...",
            recovery.artifact, mirror
        ));

        match self.tools.mirror.fetch_and_extract(
            mirror,
            &recovery.artifact,
            &recovery.download_dir,
            &run.library_dir,
        ) {
            Ok(()) => FallbackOutcome::Succeeded,
            Err(e) => {
                run.error(format!("download from fallback URL failed: {}", e));
                FallbackOutcome::AttemptedFailed(e.to_string())
            }
        }
    }
}

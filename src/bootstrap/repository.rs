//! Repository acquisition path and snapshots.

use crate::descriptor::RepoSource;
use crate::error::{BootstrapError, DescriptorError};
use crate::helpers::VcsRequest;

use super::{Bootstrapper, Recovery, Resume, Run, State};

fn request<'a>(run: &'a Run<'_>, source: &'a RepoSource, url: Option<&'a str>) -> VcsRequest<'a> {
    VcsRequest {
        kind: source.kind,
        url,
        name: run.name(),
        dest: run.library_dir(),
        branch: source.branch.as_deref(),
        revision: source.revision.as_deref(),
    }
}

impl Bootstrapper<'_> {
    /// `AcquiringRepo`: clone or update from the primary URL.
    pub(super) fn acquire_repo(&self, run: &mut Run<'_>, source: &RepoSource) -> State {
        if source.branch.is_some() && source.revision.is_some() {
            run.error(format!(
                "cannot specify both branch (to follow) and revision for repository '{}'",
                run.name()
            ));
            return State::Failed(DescriptorError::BranchAndRevision.into());
        }

        let result = self
            .tools
            .vcs
            .update_state(&request(run, source, Some(&source.url)));

        match result {
            Ok(()) => {
                self.snapshot(run, source);
                State::Postprocessing
            }
            Err(e) => {
                run.error(format!(
                    "updating repository state for '{}' failed: {}",
                    run.name(),
                    e
                ));
                State::Recovering(Recovery {
                    artifact: source.snapshot_archive_name(run.name()),
                    download_dir: self.tools.cache.snapshot_dir(),
                    primary: e.to_string(),
                    resume: Resume::Repository(source.clone()),
                })
            }
        }
    }

    /// Check out the requested state from the working copy the mirror restored.
    pub(super) fn rederive(&self, run: &mut Run<'_>, source: &RepoSource) -> State {
        let result = self.tools.vcs.update_state(&request(run, source, None));

        match result {
            Ok(()) => {
                self.snapshot(run, source);
                State::Postprocessing
            }
            Err(e) => {
                run.error(format!(
                    "updating state from downloaded repository from fallback URL failed: {}",
                    e
                ));
                State::Failed(BootstrapError::Rederive(e))
            }
        }
    }

    /// Write `<snapshot dir>/<name>[_<revision>].tar.gz` if snapshots are enabled.
    ///
    /// Unpinned snapshots are marked latest and replace an older one. A failed
    /// snapshot is logged and does not fail the bootstrap.
    fn snapshot(&self, run: &mut Run<'_>, source: &RepoSource) {
        if !self.config.create_snapshots {
            return;
        }

        let archive = self
            .tools
            .cache
            .snapshot_dir()
            .join(source.snapshot_archive_name(run.name()));
        run.info(format!("creating snapshot of '{}' repository...", run.name()));

        let result = self.tools.codec.create_from_directory(
            &run.library_dir,
            &archive,
            source.revision.is_none(),
        );
        match result {
            Ok(()) => run.snapshot = Some(archive),
            Err(e) => run.warning(format!(
                "snapshot {} for '{}' not written: {}",
                archive.display(),
                run.name(),
                e
            )),
        }
    }
}

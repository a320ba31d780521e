//! Archive acquisition path.

use std::path::Path;

use crate::descriptor::ArchiveSource;
use crate::error::BootstrapError;
use crate::helpers::http::url_filename;

use super::{Bootstrapper, FallbackArtifact, Recovery, Resume, Run, State};

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Bootstrapper<'_> {
    /// `AcquiringArchive`: download into the archive cache, then replace the
    /// library directory with the extracted content.
    pub(super) fn acquire_archive(&self, run: &mut Run<'_>, source: &ArchiveSource) -> State {
        let download_dir = self.tools.cache.archive_dir();

        let file = match self.tools.cache.download_file(
            &source.url,
            &download_dir,
            &source.integrity,
            source.user_agent.as_deref(),
        ) {
            Ok(file) => file,
            Err(e) => {
                run.error(format!(
                    "downloading of file for '{}' from {} failed: {}",
                    run.name(),
                    source.url,
                    e
                ));
                let artifact = match self.config.fallback_artifact {
                    // nothing was downloaded, so there is no name
                    FallbackArtifact::DownloadedName => String::new(),
                    FallbackArtifact::UrlName => url_filename(&source.url).unwrap_or_default(),
                };
                return State::Recovering(Recovery {
                    artifact,
                    download_dir,
                    primary: e.to_string(),
                    resume: Resume::Archive,
                });
            }
        };

        if run.library_dir.exists()
            && let Err(source) = std::fs::remove_dir_all(&run.library_dir)
        {
            run.error(format!(
                "cannot clear {} for '{}': {}",
                run.library_dir.display(),
                run.name(),
                source
            ));
            return State::Failed(BootstrapError::LibraryDir {
                path: run.library_dir.clone(),
                source,
            });
        }

        match self.tools.codec.extract(&file, &run.library_dir) {
            Ok(()) => State::Postprocessing,
            Err(e) => {
                run.error(format!(
                    "extraction of file '{}' failed: {}",
                    file.display(),
                    e
                ));
                State::Recovering(Recovery {
                    artifact: base_name(&file),
                    download_dir,
                    primary: e.to_string(),
                    resume: Resume::Archive,
                })
            }
        }
    }
}

//! Drives the orchestrator over every library of a descriptor file.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use crate::bootstrap::{BootstrapReport, Bootstrapper};
use crate::core::lock::acquire_library_lock;
use crate::core::output;
use crate::descriptor::LibraryDescriptor;

/// Options for [`bootstrap_all`].
#[derive(Debug, Clone, Default)]
pub struct DriveOptions {
    /// Directory that receives one `<name>` subdirectory per library
    pub dest: PathBuf,
    /// Directory for per-library lock files
    pub lock_dir: PathBuf,
    /// Restrict to these libraries (all when empty)
    pub only: Vec<String>,
    /// Continue with the next library after a failure
    pub keep_going: bool,
}

/// Per-library outcome of a drive.
#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Selected but not attempted because an earlier library failed
    pub skipped: Vec<String>,
}

impl Summary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    fn record(&mut self, report: &BootstrapReport) {
        match &report.error {
            None => self.succeeded.push(report.name.clone()),
            Some(e) => self.failed.push((report.name.clone(), e.to_string())),
        }
    }
}

/// Pick the libraries named in `only`, in declaration order.
pub fn select<'d>(
    descriptors: &'d [LibraryDescriptor],
    only: &[String],
) -> Result<Vec<&'d LibraryDescriptor>> {
    if only.is_empty() {
        return Ok(descriptors.iter().collect());
    }

    for name in only {
        if !descriptors.iter().any(|d| &d.name == name) {
            bail!("Library '{}' is not declared in the descriptor file", name);
        }
    }

    Ok(descriptors
        .iter()
        .filter(|d| only.contains(&d.name))
        .collect())
}

/// Bootstrap the selected libraries in order, each under its own lock.
pub fn bootstrap_all(
    bootstrapper: &Bootstrapper<'_>,
    descriptors: &[LibraryDescriptor],
    options: &DriveOptions,
) -> Result<Summary> {
    let selected = select(descriptors, &options.only)?;
    let total = selected.len();
    let mut summary = Summary::default();

    for (i, descriptor) in selected.iter().enumerate() {
        if !summary.failed.is_empty() && !options.keep_going {
            summary.skipped.push(descriptor.name.clone());
            continue;
        }

        output::action_numbered(i + 1, total, &descriptor.name);
        let dir = library_dir(&options.dest, &descriptor.name);

        let _lock = match acquire_library_lock(&options.lock_dir, &descriptor.name) {
            Ok(lock) => lock,
            Err(e) => {
                output::error(&format!("{:#}", e));
                summary.failed.push((descriptor.name.clone(), e.to_string()));
                continue;
            }
        };

        let report = bootstrapper.bootstrap(descriptor, &dir);
        if report.success() {
            output::success(&format!("{} ready in {}", descriptor.name, dir.display()));
        }
        summary.record(&report);
    }

    Ok(summary)
}

/// Print the end-of-run summary.
pub fn print_summary(summary: &Summary) {
    output::action("Summary");
    for name in &summary.succeeded {
        output::list_item(name, "ok", false);
    }
    for (name, _) in &summary.failed {
        output::list_item(name, "FAILED", true);
    }
    for name in &summary.skipped {
        output::list_item(name, "skipped", false);
    }
}

/// Library directory for `name` under `dest`.
pub fn library_dir(dest: &Path, name: &str) -> PathBuf {
    dest.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapConfig;
    use crate::core::lock::lock_path;
    use crate::descriptor::RawSource;
    use crate::test_support::Fakes;

    fn good(name: &str) -> LibraryDescriptor {
        LibraryDescriptor::new(name).with_source(RawSource {
            kind: Some("git".into()),
            url: Some(format!("https://git.example/{}.git", name)),
            ..Default::default()
        })
    }

    fn bad(name: &str) -> LibraryDescriptor {
        LibraryDescriptor::new(name)
    }

    fn options(fakes: &Fakes, keep_going: bool) -> DriveOptions {
        DriveOptions {
            dest: fakes.tmp.path().join("deps"),
            lock_dir: fakes.tmp.path().join("locks"),
            only: Vec::new(),
            keep_going,
        }
    }

    #[test]
    fn test_select_all_by_default() {
        let descriptors = vec![good("a"), good("b")];
        let selected = select(&descriptors, &[]).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_keeps_declaration_order() {
        let descriptors = vec![good("a"), good("b"), good("c")];
        let selected = select(&descriptors, &["c".into(), "a".into()]).unwrap();
        let names: Vec<&str> = selected.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_select_unknown_library() {
        let descriptors = vec![good("a")];
        let err = select(&descriptors, &["zz".into()]).unwrap_err();
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_all_libraries_bootstrapped_into_dest() {
        let fakes = Fakes::new();
        let bootstrapper = Bootstrapper::new(BootstrapConfig::new(), fakes.toolset());
        let options = options(&fakes, false);

        let summary =
            bootstrap_all(&bootstrapper, &[good("a"), good("b")], &options).unwrap();

        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded, vec!["a".to_string(), "b".to_string()]);
        let dests: Vec<PathBuf> = fakes.vcs.calls.borrow().iter().map(|c| c.dest.clone()).collect();
        assert_eq!(dests, vec![options.dest.join("a"), options.dest.join("b")]);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let fakes = Fakes::new();
        let bootstrapper = Bootstrapper::new(BootstrapConfig::new(), fakes.toolset());

        let summary = bootstrap_all(
            &bootstrapper,
            &[good("a"), bad("b"), good("c")],
            &options(&fakes, false),
        )
        .unwrap();

        assert!(!summary.all_succeeded());
        assert_eq!(summary.succeeded, vec!["a".to_string()]);
        assert_eq!(summary.failed[0].0, "b");
        assert!(summary.failed[0].1.contains("missing source description"));
        assert_eq!(summary.skipped, vec!["c".to_string()]);
    }

    #[test]
    fn test_keep_going() {
        let fakes = Fakes::new();
        let bootstrapper = Bootstrapper::new(BootstrapConfig::new(), fakes.toolset());

        let summary = bootstrap_all(
            &bootstrapper,
            &[bad("a"), good("b")],
            &options(&fakes, true),
        )
        .unwrap();

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.succeeded, vec!["b".to_string()]);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn test_locks_released_after_each_library() {
        let fakes = Fakes::new();
        let bootstrapper = Bootstrapper::new(BootstrapConfig::new(), fakes.toolset());
        let options = options(&fakes, false);

        bootstrap_all(&bootstrapper, &[good("a")], &options).unwrap();
        assert!(!lock_path(&options.lock_dir, "a").exists());
    }

    #[test]
    fn test_library_dir() {
        assert_eq!(
            library_dir(Path::new("/deps"), "zlib"),
            PathBuf::from("/deps/zlib")
        );
    }
}

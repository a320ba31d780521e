//! Version-control adapter driving the `git`, `hg` and `svn` command-line tools.
//!
//! With a URL the working copy in `dest` is cloned or updated from the
//! remote. Without one, `dest` must already hold a working copy (typically
//! restored from a mirror snapshot) and only a local checkout is done.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::core::output;
use crate::descriptor::VcsKind;
use crate::error::VcsError;

use super::progress::with_spinner;
use super::{VcsAdapter, VcsRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandVcs;

impl VcsAdapter for CommandVcs {
    fn update_state(&self, request: &VcsRequest<'_>) -> Result<(), VcsError> {
        match request.kind {
            VcsKind::Git => git_update(request),
            VcsKind::Hg => hg_update(request),
            VcsKind::Svn => svn_update(request),
        }
    }
}

fn command(tool: &'static str, cwd: Option<&Path>) -> Command {
    let mut cmd = Command::new(tool);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    if tool == "git" {
        cmd.env("GIT_TERMINAL_PROMPT", "0");
    }
    cmd
}

/// Run `cmd`, mapping a non-zero exit to `CommandFailed` with its stderr.
fn exec(tool: &'static str, operation: &str, mut cmd: Command) -> Result<(), VcsError> {
    let result = cmd
        .output()
        .map_err(|source| VcsError::Spawn { tool, source })?;

    if !result.status.success() {
        return Err(VcsError::CommandFailed {
            tool,
            operation: operation.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn has_working_copy(kind: VcsKind, dest: &Path) -> bool {
    dest.join(kind.metadata_dir()).exists()
}

fn require_working_copy(kind: VcsKind, dest: &Path) -> Result<(), VcsError> {
    if has_working_copy(kind, dest) {
        Ok(())
    } else {
        Err(VcsError::NoWorkingCopy {
            tool: kind.tool(),
            path: dest.to_path_buf(),
        })
    }
}

/// Make room for a fresh clone: anything at `dest` that is not a working copy goes.
fn prepare_clone_target(kind: VcsKind, dest: &Path) -> Result<(), VcsError> {
    if !dest.exists() {
        return Ok(());
    }
    let non_empty = std::fs::read_dir(dest)?.next().is_some();
    if non_empty {
        output::warning(&format!(
            "{}: {} exists but is not a usable working copy, re-cloning",
            kind.tool(),
            dest.display()
        ));
    }
    std::fs::remove_dir_all(dest)?;
    Ok(())
}

fn label(request: &VcsRequest<'_>) -> String {
    match (request.branch, request.revision) {
        (_, Some(rev)) => format!("{}@{}", request.name, rev),
        (Some(branch), None) => format!("{} ({})", request.name, branch),
        (None, None) => request.name.to_string(),
    }
}

// ============================================================================
// git
// ============================================================================

fn git_head_valid(dest: &Path) -> bool {
    Command::new("git")
        .current_dir(dest)
        .args(["rev-parse", "HEAD"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git_update(request: &VcsRequest<'_>) -> Result<(), VcsError> {
    let dest = request.dest;
    let existing = has_working_copy(VcsKind::Git, dest) && git_head_valid(dest);

    match request.url {
        Some(url) if existing => {
            output::detail(&format!("git fetch {}", url));
            with_spinner(&format!("fetching {}", request.name), || {
                let mut cmd = command("git", Some(dest));
                cmd.args(["remote", "set-url", "origin", url]);
                exec("git", "remote set-url", cmd)?;
                let mut cmd = command("git", Some(dest));
                cmd.args(["fetch", "--tags", "--force", "origin"]);
                exec("git", "fetch", cmd)
            })?;
        }
        Some(url) => {
            prepare_clone_target(VcsKind::Git, dest)?;
            output::detail(&format!("git clone {}", url));
            with_spinner(&format!("cloning {}", request.name), || {
                let mut cmd = command("git", None);
                cmd.args(["clone", "--progress", url]).arg(dest);
                exec("git", "clone", cmd)
            })?;
        }
        None if existing => {}
        None => {
            return Err(VcsError::NoWorkingCopy {
                tool: "git",
                path: dest.to_path_buf(),
            });
        }
    }

    let mut cmd = command("git", Some(dest));
    match (request.revision, request.branch) {
        (Some(rev), _) => {
            cmd.args(["checkout", "--force", rev]);
        }
        (None, Some(branch)) if request.url.is_some() => {
            cmd.args(["checkout", "--force", "-B", branch])
                .arg(format!("origin/{}", branch));
        }
        (None, Some(branch)) => {
            cmd.args(["checkout", "--force", branch]);
        }
        // freshly cloned, already on the default branch
        (None, None) if !existing => return Ok(()),
        (None, None) if request.url.is_some() => {
            cmd.args(["checkout", "--force", "origin/HEAD"]);
        }
        (None, None) => return Ok(()),
    }
    exec("git", "checkout", cmd)?;
    output::detail(&format!("git: checked out {}", label(request)));
    Ok(())
}

// ============================================================================
// hg
// ============================================================================

fn hg_update(request: &VcsRequest<'_>) -> Result<(), VcsError> {
    let dest = request.dest;

    match request.url {
        Some(url) if has_working_copy(VcsKind::Hg, dest) => {
            output::detail(&format!("hg pull {}", url));
            with_spinner(&format!("pulling {}", request.name), || {
                let mut cmd = command("hg", Some(dest));
                cmd.args(["--noninteractive", "pull", url]);
                exec("hg", "pull", cmd)
            })?;
        }
        Some(url) => {
            prepare_clone_target(VcsKind::Hg, dest)?;
            output::detail(&format!("hg clone {}", url));
            with_spinner(&format!("cloning {}", request.name), || {
                let mut cmd = command("hg", None);
                cmd.args(["--noninteractive", "clone", "--noupdate", url])
                    .arg(dest);
                exec("hg", "clone", cmd)
            })?;
        }
        None => require_working_copy(VcsKind::Hg, dest)?,
    }

    let mut cmd = command("hg", Some(dest));
    cmd.args(["--noninteractive", "update", "--clean"]);
    match (request.revision, request.branch) {
        (Some(rev), _) => {
            cmd.args(["--rev", rev]);
        }
        (None, Some(branch)) => {
            cmd.arg(branch);
        }
        (None, None) => {}
    }
    exec("hg", "update", cmd)?;
    output::detail(&format!("hg: updated {}", label(request)));
    Ok(())
}

// ============================================================================
// svn
// ============================================================================

fn svn_update(request: &VcsRequest<'_>) -> Result<(), VcsError> {
    if let Some(branch) = request.branch {
        return Err(VcsError::Unsupported(format!(
            "svn has no branch to follow ('{}'); point the URL at the branch instead",
            branch
        )));
    }

    let dest = request.dest;
    let Some(url) = request.url else {
        // an svn working copy cannot switch revisions offline
        require_working_copy(VcsKind::Svn, dest)?;
        output::detail(&format!("svn: using restored working copy of {}", request.name));
        return Ok(());
    };

    let mut cmd;
    let operation;
    if has_working_copy(VcsKind::Svn, dest) {
        cmd = command("svn", Some(dest));
        cmd.args(["update", "--non-interactive"]);
        operation = "update";
    } else {
        prepare_clone_target(VcsKind::Svn, dest)?;
        cmd = command("svn", None);
        cmd.args(["checkout", "--non-interactive", url]).arg(dest);
        operation = "checkout";
    }
    if let Some(rev) = request.revision {
        cmd.args(["--revision", rev]);
    }

    output::detail(&format!("svn {} {}", operation, url));
    with_spinner(&format!("svn {} {}", operation, request.name), || {
        exec("svn", operation, cmd)
    })?;
    output::detail(&format!("svn: updated {}", label(request)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request<'a>(kind: VcsKind, url: Option<&'a str>, dest: &'a Path) -> VcsRequest<'a> {
        VcsRequest {
            kind,
            url,
            name: "libfoo",
            dest,
            branch: None,
            revision: None,
        }
    }

    fn have_git() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let out = Command::new("git")
            .current_dir(dir)
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .output()
            .unwrap();
        assert!(out.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    #[test]
    fn test_no_url_without_working_copy_fails() {
        let tmp = TempDir::new().unwrap();
        for kind in [VcsKind::Git, VcsKind::Hg, VcsKind::Svn] {
            let result = CommandVcs.update_state(&request(kind, None, tmp.path()));
            assert!(
                matches!(result, Err(VcsError::NoWorkingCopy { .. })),
                "{:?}: {:?}",
                kind,
                result
            );
        }
    }

    #[test]
    fn test_svn_rejects_branch() {
        let tmp = TempDir::new().unwrap();
        let mut req = request(VcsKind::Svn, Some("https://svn.example/repo"), tmp.path());
        req.branch = Some("stable");
        assert!(matches!(
            CommandVcs.update_state(&req),
            Err(VcsError::Unsupported(_))
        ));
    }

    #[test]
    fn test_svn_restored_working_copy_without_url() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".svn")).unwrap();
        CommandVcs
            .update_state(&request(VcsKind::Svn, None, tmp.path()))
            .unwrap();
    }

    #[test]
    fn test_prepare_clone_target_removes_stale_content() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("libfoo");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("junk"), "x").unwrap();

        prepare_clone_target(VcsKind::Git, &dest).unwrap();
        assert!(!dest.exists());

        // missing target is fine
        prepare_clone_target(VcsKind::Git, &dest).unwrap();
    }

    #[test]
    fn test_label() {
        let tmp = TempDir::new().unwrap();
        let mut req = request(VcsKind::Git, None, tmp.path());
        assert_eq!(label(&req), "libfoo");
        req.branch = Some("main");
        assert_eq!(label(&req), "libfoo (main)");
        req.branch = None;
        req.revision = Some("abc");
        assert_eq!(label(&req), "libfoo@abc");
    }

    #[test]
    fn test_git_clone_checkout_and_offline_revision() {
        if !have_git() {
            eprintln!("git not installed, skipping");
            return;
        }

        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        git(&upstream, &["init", "-q"]);
        std::fs::write(upstream.join("version"), "1").unwrap();
        git(&upstream, &["add", "version"]);
        git(&upstream, &["commit", "-q", "-m", "one"]);
        let first = git(&upstream, &["rev-parse", "HEAD"]);
        git(&upstream, &["branch", "feature"]);
        std::fs::write(upstream.join("version"), "2").unwrap();
        git(&upstream, &["commit", "-q", "-am", "two"]);

        let url = upstream.to_string_lossy().to_string();
        let dest = tmp.path().join("libfoo");
        std::fs::create_dir_all(&dest).unwrap();

        // clone at the default branch
        CommandVcs
            .update_state(&request(VcsKind::Git, Some(&url), &dest))
            .unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("version")).unwrap(), "2");

        // offline checkout of a pinned revision
        let mut req = request(VcsKind::Git, None, &dest);
        req.revision = Some(&first);
        CommandVcs.update_state(&req).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("version")).unwrap(), "1");

        // follow a branch from the remote
        let mut req = request(VcsKind::Git, Some(&url), &dest);
        req.branch = Some("feature");
        CommandVcs.update_state(&req).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("version")).unwrap(), "1");
    }

    #[test]
    fn test_git_clone_failure_reports_stderr() {
        if !have_git() {
            eprintln!("git not installed, skipping");
            return;
        }

        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("no-such-repo");
        let url = missing.to_string_lossy().to_string();
        let result =
            CommandVcs.update_state(&request(VcsKind::Git, Some(&url), &tmp.path().join("libfoo")));
        match result {
            Err(VcsError::CommandFailed { tool, operation, .. }) => {
                assert_eq!(tool, "git");
                assert_eq!(operation, "clone");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

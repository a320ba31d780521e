//! Postprocessing runner - `patch` and scripts.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::output;
use crate::error::PostprocessError;

use super::PostRunner;

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

/// Resolve a relative path against the current directory, since `patch`
/// runs inside the library directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Interpreter for a script, chosen by extension.
fn script_command(script: &Path) -> Command {
    match script.extension().and_then(|e| e.to_str()) {
        Some("py") => {
            let mut cmd = Command::new("python3");
            cmd.arg(script);
            cmd
        }
        Some("sh") => {
            let mut cmd = Command::new("sh");
            cmd.arg(script);
            cmd
        }
        _ => Command::new(script),
    }
}

impl PostRunner for CommandRunner {
    fn apply_patch(
        &self,
        name: &str,
        dir: &Path,
        patch: &Path,
        pnum: u32,
    ) -> Result<(), PostprocessError> {
        let patch = absolute(patch);
        if !patch.is_file() {
            return Err(PostprocessError::PatchNotFound(patch));
        }

        output::detail(&format!(
            "patch -p{} -i {} ({})",
            pnum,
            patch.display(),
            name
        ));

        let result = Command::new("patch")
            .current_dir(dir)
            .arg(format!("-p{}", pnum))
            .arg("-i")
            .arg(&patch)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| PostprocessError::Spawn {
                program: "patch".to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(PostprocessError::PatchFailed {
                file: patch,
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn run_script(&self, script: &Path) -> Result<(), PostprocessError> {
        let script = absolute(script);
        let mut cmd = script_command(&script);
        let program = cmd.get_program().to_string_lossy().to_string();
        output::detail(&format!("running {}", script.display()));

        let status = cmd
            .stdin(Stdio::null())
            .status()
            .map_err(|source| PostprocessError::Spawn { program, source })?;

        if !status.success() {
            return Err(PostprocessError::ScriptFailed {
                file: script,
                code: status.code(),
            });
        }
        Ok(())
    }
}

//! Postprocessing dispatcher.

use crate::descriptor::PostprocessSpec;

use super::{Bootstrapper, Run, State};

impl Bootstrapper<'_> {
    /// `Postprocessing`: apply the patch or run the script, if one is declared.
    pub(super) fn postprocess(&self, run: &mut Run<'_>) -> State {
        let Some(raw) = run.descriptor.postprocess() else {
            return State::Done;
        };

        let spec = match raw.validate() {
            Ok(spec) => spec,
            Err(e) => {
                run.error(format!(
                    "postprocessing object for library '{}' is invalid: {}",
                    run.name(),
                    e
                ));
                return State::Failed(e.into());
            }
        };

        let result = match &spec {
            PostprocessSpec::Patch { file, pnum } => {
                let file = match &self.config.postprocessing_dir {
                    Some(root) => root.join(file),
                    None => file.clone(),
                };
                run.info(format!("applying patch {} to '{}'", file.display(), run.name()));
                self.tools
                    .runner
                    .apply_patch(run.name(), &run.library_dir, &file, *pnum)
                    .map_err(|e| (file, e))
            }
            PostprocessSpec::Script { file } => {
                run.info(format!("running script {} for '{}'", file.display(), run.name()));
                self.tools
                    .runner
                    .run_script(file)
                    .map_err(|e| (file.clone(), e))
            }
        };

        match result {
            Ok(()) => State::Done,
            Err((file, e)) => {
                let what = match spec {
                    PostprocessSpec::Patch { .. } => "patch application",
                    PostprocessSpec::Script { .. } => "script execution",
                };
                run.error(format!(
                    "{} of {} failed for library '{}': {}",
                    what,
                    file.display(),
                    run.name(),
                    e
                ));
                State::Failed(e.into())
            }
        }
    }
}

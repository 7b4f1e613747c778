use super::command::ToolCommand;
use super::{MinimizeOutput, MinimizeRequest, Minimizer};
use crate::engine::cancel::CancellationToken;
use crate::engine::error::EngineError;
use std::path::PathBuf;

/// Runs the external minimization program as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandMinimizer {
    program: PathBuf,
}

impl CommandMinimizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn command(&self, request: &MinimizeRequest) -> ToolCommand {
        let cmd = ToolCommand::new("minimizer", &self.program)
            .arg("-t")
            .arg(request.preparation_file)
            .arg("-i")
            .arg(request.input)
            .arg("-nitr")
            .arg(request.iterations.to_string())
            .arg("-env")
            .arg(request.environment.flag())
            .arg("-w")
            .arg(request.directory)
            .arg("-o")
            .arg(request.output_path());
        if request.keep_parameters {
            cmd.arg("-keep")
        } else {
            cmd
        }
    }
}

impl Minimizer for CommandMinimizer {
    fn minimize(
        &self,
        request: &MinimizeRequest,
        cancel: &CancellationToken,
    ) -> Result<MinimizeOutput, EngineError> {
        let cmd = self.command(request);
        let captured = cmd.run(request.directory, cancel)?;
        let pose_path = request.output_path();
        cmd.require_artifact(&pose_path, &captured)?;
        Ok(MinimizeOutput {
            report: captured.stdout,
            pose_path,
        })
    }
}

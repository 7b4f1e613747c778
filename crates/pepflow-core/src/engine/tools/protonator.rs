use super::command::ToolCommand;
use super::{ProtonateRequest, Protonator};
use crate::core::io::pdb;
use crate::engine::cancel::CancellationToken;
use crate::engine::error::{EngineError, ToolFailure};
use std::path::PathBuf;

/// Runs the external hydrogen-placement program; its stdout is the protonated file.
#[derive(Debug, Clone)]
pub struct CommandProtonator {
    program: PathBuf,
}

impl CommandProtonator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn command(&self, request: &ProtonateRequest) -> ToolCommand {
        let cmd = ToolCommand::new("protonator", &self.program);
        let cmd = match request.flip {
            Some(true) => cmd.arg("-FLIP"),
            Some(false) => cmd.arg("-NOFLIP"),
            None => cmd,
        };
        cmd.arg(request.input)
    }
}

impl Protonator for CommandProtonator {
    fn protonate(
        &self,
        request: &ProtonateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let cmd = self.command(request);
        let captured = cmd.run(request.directory, cancel)?;
        if !captured.stdout.lines().any(pdb::is_coordinate_record) {
            return Err(cmd.failure(
                ToolFailure::MissingArtifact(captured.stdout_path.clone()),
                &captured,
            ));
        }
        Ok(captured.stdout)
    }
}

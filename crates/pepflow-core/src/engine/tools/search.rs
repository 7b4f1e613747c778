use super::command::ToolCommand;
use super::{SearchOutput, SearchRequest, SearchTool};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::ClusteringMode;
use crate::engine::error::EngineError;
use std::path::PathBuf;

/// Runs the conformational search program as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandSearchTool {
    program: PathBuf,
}

impl CommandSearchTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn command(&self, request: &SearchRequest) -> ToolCommand {
        let mut cmd = ToolCommand::new("search", &self.program)
            .arg("-t")
            .arg(request.preparation_file)
            .arg("-s")
            .arg(request.sequence)
            .arg("-N")
            .arg(request.runs.to_string())
            .arg("-n")
            .arg(request.steps.to_string())
            .arg("-c")
            .arg(request.workers.to_string())
            .arg("-o")
            .arg(request.job_name)
            .arg("-w")
            .arg(request.directory);
        if let Some(reference) = request.reference {
            cmd = cmd.arg("-ref").arg(reference);
        }
        if let ClusteringMode::Contact { cutoff } = request.clustering {
            cmd = cmd
                .arg("-cm")
                .arg("contact")
                .arg("-nc")
                .arg(format!("{}", cutoff));
        }
        cmd
    }
}

impl SearchTool for CommandSearchTool {
    fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchOutput, EngineError> {
        let cmd = self.command(request);
        let captured = cmd.run(request.directory, cancel)?;
        let poses_path = request.poses_path();
        cmd.require_artifact(&poses_path, &captured)?;
        Ok(SearchOutput {
            summary: captured.stdout,
            poses_path,
        })
    }
}

use crate::engine::cancel::CancellationToken;
use crate::engine::error::{EngineError, ToolFailure};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const OUTPUT_TAIL_LINES: usize = 40;

/// Captured streams of a finished invocation, kept as log files in the step directory.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

/// A single external program invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: &'static str,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(tool: &'static str, program: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    /// Runs the program in `directory`, blocking until it exits.
    ///
    /// Stdout and stderr go to `<tool>.stdout.log` and `<tool>.stderr.log` in
    /// the same directory. The child is killed as soon as `cancel` fires.
    pub fn run(
        &self,
        directory: &Path,
        cancel: &CancellationToken,
    ) -> Result<CapturedOutput, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let stdout_path = directory.join(format!("{}.stdout.log", self.tool));
        let stderr_path = directory.join(format!("{}.stderr.log", self.tool));
        let stdout = File::create(&stdout_path)?;
        let stderr = File::create(&stderr_path)?;

        info!(tool = self.tool, program = %self.program.display(), "Launching external tool.");
        debug!(tool = self.tool, args = ?self.args, cwd = %directory.display());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| EngineError::ExternalTool {
                tool: self.tool.to_string(),
                reason: ToolFailure::Launch(format!("{}: {}", self.program.display(), e)),
                output: String::new(),
            })?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                warn!(tool = self.tool, "Cancellation requested, terminating external tool.");
                if let Err(e) = child.kill() {
                    warn!(tool = self.tool, error = %e, "Failed to kill external tool.");
                }
                let _ = child.wait();
                return Err(EngineError::Cancelled);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let captured = CapturedOutput {
            stdout: read_lossy(&stdout_path)?,
            stdout_path,
            stderr_path,
        };
        if !status.success() {
            return Err(self.failure(ToolFailure::ExitStatus(status.code()), &captured));
        }
        debug!(tool = self.tool, "External tool finished successfully.");
        Ok(captured)
    }

    /// Builds an [`EngineError::ExternalTool`] carrying the tail of both streams.
    pub fn failure(&self, reason: ToolFailure, captured: &CapturedOutput) -> EngineError {
        let stderr = read_lossy(&captured.stderr_path).unwrap_or_default();
        let combined = format!("{}{}", captured.stdout, stderr);
        EngineError::ExternalTool {
            tool: self.tool.to_string(),
            reason,
            output: tail(&combined, OUTPUT_TAIL_LINES),
        }
    }

    /// Fails unless `path` exists after the run.
    pub fn require_artifact(
        &self,
        path: &Path,
        captured: &CapturedOutput,
    ) -> Result<(), EngineError> {
        if path.is_file() {
            Ok(())
        } else {
            Err(self.failure(ToolFailure::MissingArtifact(path.to_path_buf()), captured))
        }
    }
}

fn read_lossy(path: &Path) -> Result<String, EngineError> {
    Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn shell(script: &str) -> ToolCommand {
        ToolCommand::new("shell", "sh").arg("-c").arg(script)
    }

    #[test]
    fn captures_stdout_to_log_file() {
        let dir = tempdir().unwrap();
        let out = shell("echo hello")
            .run(dir.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert!(dir.path().join("shell.stdout.log").exists());
    }

    #[test]
    fn non_zero_exit_reports_status_and_output() {
        let dir = tempdir().unwrap();
        let err = shell("echo partial; echo broken >&2; exit 3")
            .run(dir.path(), &CancellationToken::new())
            .unwrap_err();
        match err {
            EngineError::ExternalTool { reason, output, .. } => {
                assert_eq!(reason, ToolFailure::ExitStatus(Some(3)));
                assert!(output.contains("partial"));
                assert!(output.contains("broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let dir = tempdir().unwrap();
        let err = ToolCommand::new("ghost", "/nonexistent/tool")
            .run(dir.path(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ExternalTool {
                reason: ToolFailure::Launch(_),
                ..
            }
        ));
    }

    #[test]
    fn cancellation_kills_running_child() {
        let dir = tempdir().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        let err = shell("sleep 30").run(dir.path(), &cancel).unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let dir = tempdir().unwrap();
        let cmd = shell("true");
        let out = cmd.run(dir.path(), &CancellationToken::new()).unwrap();
        let err = cmd
            .require_artifact(&dir.path().join("pose.pdb"), &out)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ExternalTool {
                reason: ToolFailure::MissingArtifact(_),
                ..
            }
        ));
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}

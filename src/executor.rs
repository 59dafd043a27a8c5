//! Execution of the command the user picked.
//!
//! Outside context mode a command simply runs attached to the terminal. In
//! context mode the command's shape decides how it runs:
//! - interactive editors run attached, nothing is captured
//! - `cd` changes this process's working directory so later commands see it
//! - everything else runs in a subshell with combined stdout+stderr captured,
//!   echoed, and stored in the [`ContextBuffer`]
//!
//! Subprocesses get no timeout; a hung command blocks the session.

use crate::context::ContextBuffer;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// Commands that need the terminal and must not have their output captured.
pub const TEXT_EDITORS: &[&str] = &["vi", "vim", "emacs", "nano", "ed", "micro", "joe", "nvim"];

/// Exit status and combined stdout+stderr of a captured command.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub output: String,
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running shell commands and touching the working directory.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` in a subshell with the terminal's standard streams.
    fn run_attached(&self, command: &str) -> Result<ExitStatus>;

    /// Runs `command` in a subshell and captures stdout and stderr interleaved.
    fn run_captured(&self, command: &str) -> Result<CapturedOutput>;

    /// Changes the working directory of the current process.
    fn change_dir(&self, path: &Path) -> Result<()>;

    fn current_dir(&self) -> PathBuf;
}

/// Default process runner using `sh -c` (`cmd /C` on Windows).
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run_attached(&self, command: &str) -> Result<ExitStatus> {
        let status = Self::shell_command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status)
    }

    fn run_captured(&self, command: &str) -> Result<CapturedOutput> {
        // Redirect stderr into the stdout pipe inside the subshell so both
        // streams keep their relative order.
        let wrapped = if cfg!(windows) {
            format!("{} 2>&1", command)
        } else {
            format!("exec 2>&1\n{}", command)
        };
        let output = Self::shell_command(&wrapped).output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CapturedOutput {
            status: output.status,
            output: combined,
        })
    }

    fn change_dir(&self, path: &Path) -> Result<()> {
        std::env::set_current_dir(path)?;
        Ok(())
    }

    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// How a command is run in context mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind<'a> {
    Editor,
    /// `cd` with its (possibly empty) argument.
    ChangeDir(&'a str),
    Captured,
}

impl<'a> CommandKind<'a> {
    pub fn classify(command: &'a str) -> Self {
        let command = command.trim();
        let program = command.split_whitespace().next().unwrap_or_default();

        if TEXT_EDITORS.contains(&program) {
            CommandKind::Editor
        } else if program == "cd" {
            CommandKind::ChangeDir(command["cd".len()..].trim())
        } else {
            CommandKind::Captured
        }
    }
}

// =============================================================================
// Executor Implementation
// =============================================================================

/// Runs selected commands and reports their outcome.
///
/// # Example
///
/// ```no_run
/// use shell_ai::executor::Executor;
///
/// let executor = Executor::new();
/// executor.execute_attached("ls -la", &mut std::io::stdout())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Executor {
    runner: Box<dyn ProcessRunner>,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemProcessRunner))
    }

    /// Creates an executor with a custom process runner (for testing).
    pub fn with_runner(runner: Box<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn current_dir(&self) -> PathBuf {
        self.runner.current_dir()
    }

    /// Runs `command` attached to the terminal.
    ///
    /// A non-zero exit is reported to `output`, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the shell cannot be started.
    pub fn execute_attached<W: Write>(&self, command: &str, output: &mut W) -> Result<()> {
        info!("Executing command: {}", command);
        let status = self
            .runner
            .run_attached(command)
            .with_context(|| format!("failed to execute '{}'", command))?;
        Self::report_status(status, output)
    }

    /// Runs `command` in context mode, updating `context` with captured output.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be started or the directory
    /// change fails. Callers report these and keep the session going.
    pub fn execute_in_context<W: Write>(
        &self,
        command: &str,
        context: &mut ContextBuffer,
        output: &mut W,
    ) -> Result<()> {
        match CommandKind::classify(command) {
            CommandKind::Editor => self.execute_attached(command, output),
            CommandKind::ChangeDir(target) => {
                let path = resolve_cd_target(target)?;
                debug!("Changing directory to {}", path.display());
                self.runner
                    .change_dir(&path)
                    .with_context(|| format!("Error changing directory to {}", path.display()))
            }
            CommandKind::Captured => {
                info!("Executing command with captured output: {}", command);
                let captured = self
                    .runner
                    .run_captured(command)
                    .with_context(|| format!("failed to execute '{}'", command))?;

                if !captured.output.is_empty() {
                    write!(output, "\n{}", captured.output)?;
                }
                context.append(&captured.output);
                Self::report_status(captured.status, output)
            }
        }
    }

    fn report_status<W: Write>(status: ExitStatus, output: &mut W) -> Result<()> {
        if !status.success() {
            writeln!(output, "Command exited with {}", status)?;
        }
        Ok(())
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands `~` and environment variables in a `cd` argument and normalises it.
///
/// A bare `cd` targets the home directory.
pub fn resolve_cd_target(target: &str) -> Result<PathBuf> {
    let target = strip_quotes(target.trim());
    if target.is_empty() {
        return dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"));
    }

    let expanded = shellexpand::full(target)
        .with_context(|| format!("Error changing directory: cannot expand '{}'", target))?;
    Ok(normalize_path(Path::new(expanded.as_ref())))
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Lexically cleans a path: drops `.` and resolves `..` where possible.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::{Arc, Mutex};

    // =========================================================================
    // Mock implementations
    // =========================================================================

    #[derive(Default)]
    struct Calls {
        attached: Vec<String>,
        captured: Vec<String>,
        dirs: Vec<PathBuf>,
    }

    /// Mock process runner that records calls and returns canned results.
    struct MockProcessRunner {
        exit_code: i32,
        output: String,
        calls: Arc<Mutex<Calls>>,
    }

    impl MockProcessRunner {
        fn new(exit_code: i32, output: &str) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            let runner = Self {
                exit_code,
                output: output.to_string(),
                calls: Arc::clone(&calls),
            };
            (runner, calls)
        }

        fn status(&self) -> ExitStatus {
            ExitStatus::from_raw(self.exit_code << 8)
        }
    }

    impl ProcessRunner for MockProcessRunner {
        fn run_attached(&self, command: &str) -> Result<ExitStatus> {
            self.calls.lock().unwrap().attached.push(command.to_string());
            Ok(self.status())
        }

        fn run_captured(&self, command: &str) -> Result<CapturedOutput> {
            self.calls.lock().unwrap().captured.push(command.to_string());
            Ok(CapturedOutput {
                status: self.status(),
                output: self.output.clone(),
            })
        }

        fn change_dir(&self, path: &Path) -> Result<()> {
            self.calls.lock().unwrap().dirs.push(path.to_path_buf());
            Ok(())
        }

        fn current_dir(&self) -> PathBuf {
            PathBuf::from("/work")
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn test_classify_editors() {
        assert_eq!(CommandKind::classify("vim notes.txt"), CommandKind::Editor);
        assert_eq!(CommandKind::classify("nano"), CommandKind::Editor);
        assert_eq!(CommandKind::classify("  nvim ."), CommandKind::Editor);
    }

    #[test]
    fn test_classify_cd() {
        assert_eq!(CommandKind::classify("cd /tmp"), CommandKind::ChangeDir("/tmp"));
        assert_eq!(CommandKind::classify("cd"), CommandKind::ChangeDir(""));
        assert_eq!(CommandKind::classify("cd   ../src "), CommandKind::ChangeDir("../src"));
    }

    #[test]
    fn test_classify_other_commands_are_captured() {
        assert_eq!(CommandKind::classify("ls -la"), CommandKind::Captured);
        assert_eq!(CommandKind::classify("vimdiff a b"), CommandKind::Captured);
        assert_eq!(CommandKind::classify("cdrecord --help"), CommandKind::Captured);
        assert_eq!(CommandKind::classify("echo vim"), CommandKind::Captured);
    }

    // =========================================================================
    // Attached execution
    // =========================================================================

    #[test]
    fn test_execute_attached_success_is_silent() {
        let (runner, calls) = MockProcessRunner::new(0, "");
        let executor = Executor::with_runner(Box::new(runner));
        let mut out = Vec::new();

        executor.execute_attached("ls -la", &mut out).unwrap();

        assert_eq!(calls.lock().unwrap().attached, vec!["ls -la"]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_execute_attached_failure_is_reported_not_returned() {
        let (runner, _calls) = MockProcessRunner::new(2, "");
        let executor = Executor::with_runner(Box::new(runner));
        let mut out = Vec::new();

        let result = executor.execute_attached("false", &mut out);

        assert!(result.is_ok());
        assert!(String::from_utf8(out).unwrap().contains("Command exited with"));
    }

    // =========================================================================
    // Context-mode execution
    // =========================================================================

    #[test]
    fn test_captured_output_replaces_context() {
        let (runner, calls) = MockProcessRunner::new(0, "3 files\n");
        let executor = Executor::with_runner(Box::new(runner));
        let mut context = ContextBuffer::new();
        context.append("stale output");
        let mut out = Vec::new();

        executor.execute_in_context("ls | wc -l", &mut context, &mut out).unwrap();

        assert_eq!(context.read(), "3 files\n");
        assert_eq!(calls.lock().unwrap().captured, vec!["ls | wc -l"]);
        assert_eq!(String::from_utf8(out).unwrap(), "\n3 files\n");
    }

    #[test]
    fn test_captured_output_is_truncated_to_capacity() {
        let (runner, _calls) = MockProcessRunner::new(0, "abcdefghij");
        let executor = Executor::with_runner(Box::new(runner));
        let mut context = ContextBuffer::with_capacity(4);
        let mut out = Vec::new();

        executor.execute_in_context("cat big.log", &mut context, &mut out).unwrap();

        assert_eq!(context.read(), "ghij");
    }

    #[test]
    fn test_failed_captured_command_still_updates_context() {
        let (runner, _calls) = MockProcessRunner::new(1, "ls: cannot access 'x'\n");
        let executor = Executor::with_runner(Box::new(runner));
        let mut context = ContextBuffer::new();
        let mut out = Vec::new();

        executor.execute_in_context("ls x", &mut context, &mut out).unwrap();

        assert_eq!(context.read(), "ls: cannot access 'x'\n");
        assert!(String::from_utf8(out).unwrap().contains("Command exited with"));
    }

    #[test]
    fn test_editor_runs_attached_without_touching_context() {
        let (runner, calls) = MockProcessRunner::new(0, "ignored");
        let executor = Executor::with_runner(Box::new(runner));
        let mut context = ContextBuffer::new();
        context.append("keep me");
        let mut out = Vec::new();

        executor.execute_in_context("vim notes.txt", &mut context, &mut out).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.attached, vec!["vim notes.txt"]);
        assert!(calls.captured.is_empty());
        assert_eq!(context.read(), "keep me");
    }

    #[test]
    fn test_cd_changes_directory_locally() {
        let (runner, calls) = MockProcessRunner::new(0, "");
        let executor = Executor::with_runner(Box::new(runner));
        let mut context = ContextBuffer::new();
        let mut out = Vec::new();

        executor.execute_in_context("cd /var/./log/../tmp", &mut context, &mut out).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.dirs, vec![PathBuf::from("/var/tmp")]);
        assert!(calls.attached.is_empty());
        assert!(calls.captured.is_empty());
    }

    // =========================================================================
    // Path handling
    // =========================================================================

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_cd_target_strips_quotes() {
        assert_eq!(resolve_cd_target("\"/tmp/my dir\"").unwrap(), PathBuf::from("/tmp/my dir"));
        assert_eq!(resolve_cd_target("'/tmp'").unwrap(), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_resolve_cd_target_undefined_variable_is_an_error() {
        let err = resolve_cd_target("$SHAI_SURELY_UNDEFINED_VARIABLE/x").unwrap_err();
        assert!(err.to_string().contains("Error changing directory"));
    }

    #[test]
    fn test_system_runner_captures_stdout_and_stderr() {
        let captured = SystemProcessRunner
            .run_captured("echo out; echo err 1>&2")
            .unwrap();

        assert!(captured.status.success());
        assert_eq!(captured.output, "out\nerr\n");
    }

    #[test]
    fn test_system_runner_reports_exit_status() {
        let captured = SystemProcessRunner.run_captured("exit 3").unwrap();
        assert_eq!(captured.status.code(), Some(3));
    }
}

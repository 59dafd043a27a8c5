//! Appends executed commands to the user's shell history file.
//!
//! The shell is detected from `$SHELL`, and each shell gets its own file and
//! entry format so the command shows up in the next interactive session.

use crate::error::ShaiError;
use crate::providers::{EnvProvider, SystemEnvProvider, SystemTimeProvider, TimeProvider};
use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Zsh,
    Bash,
    Csh,
    Ksh,
    Fish,
}

impl ShellKind {
    /// Detects the shell from a `$SHELL` value by substring match.
    pub fn detect(shell: &str) -> Result<Self, ShaiError> {
        if shell.contains("zsh") {
            Ok(ShellKind::Zsh)
        } else if shell.contains("bash") {
            Ok(ShellKind::Bash)
        } else if shell.contains("csh") {
            // also covers tcsh
            Ok(ShellKind::Csh)
        } else if shell.contains("ksh") {
            Ok(ShellKind::Ksh)
        } else if shell.contains("fish") {
            Ok(ShellKind::Fish)
        } else {
            Err(ShaiError::UnsupportedShell(shell.to_string()))
        }
    }

    /// History file location relative to the home directory.
    pub fn history_file(&self) -> &'static str {
        match self {
            ShellKind::Zsh => ".zsh_history",
            ShellKind::Bash => ".bash_history",
            ShellKind::Csh => ".history",
            ShellKind::Ksh => ".sh_history",
            ShellKind::Fish => ".local/share/fish/fish_history",
        }
    }

    /// Formats one history entry, including the trailing newline.
    pub fn format_entry(&self, command: &str, timestamp: u64) -> String {
        match self {
            ShellKind::Zsh => format!(": {}:0;{}\n", timestamp, command),
            ShellKind::Bash | ShellKind::Csh | ShellKind::Ksh => format!("{}\n", command),
            ShellKind::Fish => format!("- cmd: {}\n  when: {}\n", command, timestamp),
        }
    }
}

/// Writes entries to the detected shell's history file.
pub struct HistoryWriter {
    env: Box<dyn EnvProvider>,
    time_provider: Box<dyn TimeProvider>,
}

impl HistoryWriter {
    pub fn new() -> Self {
        Self::with_providers(Box::new(SystemEnvProvider), Box::new(SystemTimeProvider))
    }

    /// Creates a writer with custom environment and time sources (for testing).
    pub fn with_providers(env: Box<dyn EnvProvider>, time_provider: Box<dyn TimeProvider>) -> Self {
        Self { env, time_provider }
    }

    /// Appends `command` to the history file of the shell named by `$SHELL`.
    ///
    /// # Errors
    ///
    /// Fails if `$SHELL` is unset or unrecognised, no home directory can be
    /// found, or the file cannot be written.
    pub fn append(&self, command: &str) -> Result<PathBuf> {
        let shell = self
            .env
            .var("SHELL")
            .filter(|s| !s.is_empty())
            .ok_or(ShaiError::ShellNotSet)?;
        let kind = ShellKind::detect(&shell)?;

        let home = self
            .env
            .var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("Could not find home directory"))?;

        let path = home.join(kind.history_file());
        let entry = kind.format_entry(command, self.time_provider.now());
        append_to_file(&path, &entry)
            .with_context(|| format!("failed to write history file {}", path.display()))?;

        debug!("Appended command to {}", path.display());
        Ok(path)
    }
}

impl Default for HistoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn append_to_file(path: &Path, entry: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.as_bytes())?;
    Ok(())
}

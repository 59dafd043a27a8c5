//! The interactive session loop.
//!
//! Each round generates candidates for the current request, lets the user
//! pick one (or a system option), optionally confirms/edits it, records it
//! in the shell history, and executes it. Outside context mode the session
//! ends after the first executed command; in context mode the command's
//! output feeds the next round and the user is asked for a new request.

use crate::config::Config;
use crate::context::ContextBuffer;
use crate::executor::Executor;
use crate::history::HistoryWriter;
use crate::llm_client::ShellCommandGenerator;
use crate::prompter::Prompter;
use crate::suggestions::SuggestionGenerator;
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SELECT_PROMPT: &str = "Select a command:";
const NEW_COMMAND_PROMPT: &str = "New command";

/// Fixed entries shown after the suggested commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOption {
    GenerateSuggestions,
    NewCommand,
    Dismiss,
}

impl SystemOption {
    pub const ALL: [SystemOption; 3] = [
        SystemOption::GenerateSuggestions,
        SystemOption::NewCommand,
        SystemOption::Dismiss,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SystemOption::GenerateSuggestions => "Generate new suggestions",
            SystemOption::NewCommand => "Enter a new command",
            SystemOption::Dismiss => "Dismiss",
        }
    }
}

/// What the user picked from the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Command(String),
    System(SystemOption),
}

impl Selection {
    /// Maps a menu index back to a candidate or system option.
    ///
    /// Candidates occupy the first `suggestions.len()` slots, so a candidate
    /// whose text happens to equal a system label is still a candidate.
    pub fn from_index(suggestions: &[String], index: usize) -> Option<Self> {
        match suggestions.get(index) {
            Some(command) => Some(Selection::Command(command.clone())),
            None => SystemOption::ALL
                .get(index - suggestions.len())
                .map(|option| Selection::System(*option)),
        }
    }
}

#[derive(Debug)]
enum State {
    Generating,
    Selecting(Vec<String>),
    EnteringNewPrompt,
    Confirming(String),
    Executing(String),
    /// Context mode: ask for the next request after a command ran.
    Prompting,
    Dismissed,
}

/// Session-relevant subset of the configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub suggestion_count: usize,
    pub skip_confirm: bool,
    pub skip_history: bool,
    pub context_mode: bool,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            suggestion_count: config.suggestion_count,
            skip_confirm: config.skip_confirm,
            skip_history: config.skip_history,
            context_mode: config.context_mode,
        }
    }
}

/// Drives one interactive session.
///
/// Messages for the user (warnings, captured output, the working directory
/// banner) are written to `output`; commands run attached to the real
/// terminal through the [`Executor`].
pub struct Session<P: Prompter, W: Write> {
    settings: SessionSettings,
    generator: SuggestionGenerator,
    prompter: P,
    executor: Executor,
    history: HistoryWriter,
    context: ContextBuffer,
    prompt: String,
    output: W,
}

impl<P: Prompter, W: Write> Session<P, W> {
    pub fn new(
        settings: SessionSettings,
        client: Arc<dyn ShellCommandGenerator>,
        prompter: P,
        output: W,
    ) -> Self {
        Self {
            settings,
            generator: SuggestionGenerator::new(client),
            prompter,
            executor: Executor::new(),
            history: HistoryWriter::new(),
            context: ContextBuffer::new(),
            prompt: String::new(),
            output,
        }
    }

    /// Replaces the executor (for testing).
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the history writer (for testing).
    pub fn with_history_writer(mut self, history: HistoryWriter) -> Self {
        self.history = history;
        self
    }

    pub fn with_context_buffer(mut self, context: ContextBuffer) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &ContextBuffer {
        &self.context
    }

    /// The request the most recent round was generated for.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Runs the session for `prompt` until the user dismisses it.
    ///
    /// # Errors
    ///
    /// Fails if a generation round fails entirely or user I/O breaks.
    /// Execution, `cd`, and history problems are reported and do not end
    /// the session.
    pub async fn run(&mut self, prompt: &str) -> Result<()> {
        self.prompt = prompt.to_string();

        if self.settings.context_mode {
            writeln!(
                self.output,
                "WARNING Context mode: data will be sent to the LLM, be careful if any sensitive data...\n"
            )?;
            self.print_current_dir()?;
        }

        let mut state = State::Generating;
        loop {
            debug!("Session state: {:?}", state);
            state = match state {
                State::Generating => State::Selecting(self.generate().await?),
                State::Selecting(suggestions) => self.select(suggestions)?,
                State::EnteringNewPrompt => self.read_new_prompt()?,
                State::Confirming(command) => self.confirm(command)?,
                State::Executing(command) => self.execute(&command)?,
                State::Prompting => {
                    self.print_current_dir()?;
                    self.read_new_prompt()?
                }
                State::Dismissed => {
                    info!("Session dismissed");
                    return Ok(());
                }
            };
        }
    }

    async fn generate(&mut self) -> Result<Vec<String>> {
        // Every request in the round sees the same snapshot
        let snapshot = self.settings.context_mode.then(|| self.context.read());
        info!("Generating {} suggestions for: {}", self.settings.suggestion_count, self.prompt);
        self.generator
            .generate(&self.prompt, self.settings.suggestion_count, snapshot.as_deref())
            .await
    }

    fn select(&mut self, suggestions: Vec<String>) -> Result<State> {
        let options: Vec<String> = suggestions
            .iter()
            .cloned()
            .chain(SystemOption::ALL.iter().map(|o| o.label().to_string()))
            .collect();

        let Some(index) = self.prompter.present_choices(SELECT_PROMPT, &options)? else {
            return Ok(State::Dismissed);
        };

        Ok(match Selection::from_index(&suggestions, index) {
            Some(Selection::Command(command)) if self.settings.skip_confirm => State::Executing(command),
            Some(Selection::Command(command)) => State::Confirming(command),
            Some(Selection::System(SystemOption::GenerateSuggestions)) => State::Generating,
            Some(Selection::System(SystemOption::NewCommand)) => State::EnteringNewPrompt,
            Some(Selection::System(SystemOption::Dismiss)) | None => State::Dismissed,
        })
    }

    fn confirm(&mut self, command: String) -> Result<State> {
        Ok(match self.prompter.confirm_or_edit(&command)? {
            Some(confirmed) => State::Executing(confirmed),
            None => State::Dismissed,
        })
    }

    /// An empty answer keeps the current request.
    fn read_new_prompt(&mut self) -> Result<State> {
        let Some(text) = self.prompter.prompt_free_text(NEW_COMMAND_PROMPT)? else {
            return Ok(State::Dismissed);
        };

        if text.trim().is_empty() {
            debug!("Empty request, keeping: {}", self.prompt);
        } else {
            self.prompt = text.trim().to_string();
        }
        Ok(State::Generating)
    }

    fn execute(&mut self, command: &str) -> Result<State> {
        if !self.settings.skip_history {
            if let Err(e) = self.history.append(command) {
                warn!("Failed to write shell history: {:#}", e);
                writeln!(self.output, "Warning: {:#}", e)?;
            }
        }

        if !self.settings.context_mode {
            if let Err(e) = self.executor.execute_attached(command, &mut self.output) {
                writeln!(self.output, "Error executing command: {:#}", e)?;
            }
            return Ok(State::Dismissed);
        }

        if let Err(e) = self
            .executor
            .execute_in_context(command, &mut self.context, &mut self.output)
        {
            writeln!(self.output, "Error: {:#}", e)?;
        }
        Ok(State::Prompting)
    }

    fn print_current_dir(&mut self) -> Result<()> {
        writeln!(self.output, ">>> {}", self.executor.current_dir().display())?;
        Ok(())
    }
}

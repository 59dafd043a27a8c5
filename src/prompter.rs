//! User interaction for the session loop.
//!
//! The session only talks to the [`Prompter`] trait. Two front ends exist:
//! [`PlainPrompter`] prints a numbered list and reads typed answers from any
//! reader/writer pair, and [`RichPrompter`] uses an arrow-key menu with fuzzy
//! search. Cancelling a prompt yields `None` in both, which the session
//! treats as a dismissal.

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Input};
use std::io::{self, BufRead, Stdout, StdinLock, Write};
use tracing::info;

pub trait Prompter {
    /// Shows `items` and returns the index the user picked.
    fn present_choices(&mut self, title: &str, items: &[String]) -> Result<Option<usize>>;

    /// Lets the user accept `command` as is or edit it.
    fn confirm_or_edit(&mut self, command: &str) -> Result<Option<String>>;

    /// Reads a new natural-language request.
    ///
    /// The plain front end may return an empty string; the rich one never does.
    fn prompt_free_text(&mut self, label: &str) -> Result<Option<String>>;
}

// =============================================================================
// Plain front end
// =============================================================================

/// Line-based front end: numbered list, typed index, typed text.
pub struct PlainPrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl PlainPrompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PlainPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed line, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for PlainPrompter<R, W> {
    fn present_choices(&mut self, title: &str, items: &[String]) -> Result<Option<usize>> {
        writeln!(self.output, "{}", title)?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, item)?;
        }

        loop {
            write!(self.output, "Enter selection (1-{}): ", items.len())?;
            self.output.flush()?;

            let Some(choice) = self.read_line()? else {
                return Ok(None);
            };

            match choice.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => {
                    info!("User selected option {}", n);
                    return Ok(Some(n - 1));
                }
                _ => writeln!(self.output, "Invalid selection, please try again.")?,
            }
        }
    }

    fn confirm_or_edit(&mut self, command: &str) -> Result<Option<String>> {
        write!(self.output, "Confirm [{}]: ", command)?;
        self.output.flush()?;

        Ok(self.read_line()?.map(|edited| {
            if edited.is_empty() {
                command.to_string()
            } else {
                edited
            }
        }))
    }

    fn prompt_free_text(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        self.read_line()
    }
}

// =============================================================================
// Rich front end
// =============================================================================

/// Terminal menu front end: fuzzy-searchable select and editable inputs.
pub struct RichPrompter {
    theme: ColorfulTheme,
}

impl RichPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for RichPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for RichPrompter {
    fn present_choices(&mut self, title: &str, items: &[String]) -> Result<Option<usize>> {
        let selection = FuzzySelect::with_theme(&self.theme)
            .with_prompt(title)
            .items(items)
            .default(0)
            .interact_opt();
        Ok(cancelled_as_none(selection)?.flatten())
    }

    fn confirm_or_edit(&mut self, command: &str) -> Result<Option<String>> {
        let edited = Input::<String>::with_theme(&self.theme)
            .with_prompt("Confirm")
            .with_initial_text(command)
            .allow_empty(false)
            .interact_text();
        cancelled_as_none(edited)
    }

    fn prompt_free_text(&mut self, label: &str) -> Result<Option<String>> {
        let text = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .validate_with(|input: &String| -> Result<(), &'static str> {
                if input.trim().is_empty() {
                    Err("Please enter a request")
                } else {
                    Ok(())
                }
            })
            .interact_text();
        Ok(cancelled_as_none(text)?.map(|t| t.trim().to_string()))
    }
}

/// Ctrl-C inside a dialoguer prompt surfaces as an interrupted read.
fn cancelled_as_none<T>(result: dialoguer::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

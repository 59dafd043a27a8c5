//! Error taxonomy for the library.
//!
//! Startup failures (configuration, credentials, provider selection) are
//! fatal. API and response-shape errors are scoped to a single suggestion
//! task and only surface when every task in a round fails. Execution and
//! history errors are reported to the user and never end the session.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaiError {
    /// The config file exists but is not a JSON object of strings.
    #[error("error parsing config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported API provider: {0}")]
    UnsupportedProvider(String),

    #[error("no API key configured, set OPENAI_API_KEY or GROQ_API_KEY")]
    MissingCredentials,

    /// The provider answered with a non-200 status.
    #[error("API request failed with status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("no completions returned from API")]
    NoCompletions,

    #[error("failed to parse command from LLM response: {0}")]
    ResponseParse(#[source] serde_json::Error),

    #[error("LLM response contained an empty command")]
    EmptyCommand,

    #[error("LLM response was empty")]
    NoContent,

    #[error("SHELL environment variable not set")]
    ShellNotSet,

    #[error("unsupported shell: {0}")]
    UnsupportedShell(String),
}

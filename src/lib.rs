//! Shell AI - natural-language to shell command assistant.
//!
//! This library provides the pieces behind the `shai` binary:
//!
//! - **Suggestion generation** via OpenAI-compatible chat completion APIs
//!   (OpenAI or Groq), several requests in parallel
//! - **Response extraction** of the `{"command": ...}` payload from free-form
//!   model output
//! - **Interactive selection** with confirm/edit and regeneration
//! - **Context mode**, where captured command output is fed back to the model
//! - **Shell history** integration for zsh, bash, csh, ksh and fish
//!
//! # Architecture
//!
//! - [`config`] - Layered configuration (defaults, JSON file, environment)
//! - [`context`] - Bounded buffer of recent command output
//! - [`error`] - Typed error taxonomy
//! - [`executor`] - Runs selected commands attached or captured
//! - [`history`] - Appends commands to the user's shell history
//! - [`http_client`] - HTTP client abstraction
//! - [`llm_client`] - Chat completion client and prompt construction
//! - [`parser`] - Extracts the command from an LLM response
//! - [`prompter`] - Plain and rich interactive front ends
//! - [`providers`] - Shared dependency injection traits
//! - [`session`] - The interactive session loop
//! - [`suggestions`] - Concurrent suggestion rounds
//!
//! # Example
//!
//! ```no_run
//! use shell_ai::config::Config;
//! use shell_ai::llm_client::LlmClient;
//! use shell_ai::prompter::PlainPrompter;
//! use shell_ai::session::{Session, SessionSettings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let client = Arc::new(LlmClient::new(&config)?);
//!
//!     let mut session = Session::new(
//!         SessionSettings::from(&config),
//!         client,
//!         PlainPrompter::stdio(),
//!         std::io::stdout(),
//!     );
//!     session.run("list files sorted by size").await
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod history;
pub mod http_client;
pub mod llm_client;
pub mod parser;
pub mod prompter;
pub mod providers;
pub mod session;
pub mod suggestions;

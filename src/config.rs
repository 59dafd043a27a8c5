//! Layered configuration: built-in defaults, then the JSON config file, then
//! environment variables.
//!
//! The config file is a flat JSON object whose keys are the same uppercase
//! names as the environment variables and whose values are all strings.
//! Numeric and boolean values that fail to parse are skipped and the
//! previous layer's value is kept, both in the file and in the environment.

use crate::error::ShaiError;
use crate::providers::{EnvProvider, SystemEnvProvider};
use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_APP_NAME: &str = "shell-ai";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    /// Sent as `max_tokens` only when greater than zero.
    pub openai_max_tokens: u32,
    pub openai_api_base: String,
    pub openai_organization: String,
    pub openai_proxy: String,
    pub openai_api_version: String,

    pub groq_api_key: String,
    pub groq_model: String,

    pub api_provider: String,
    pub suggestion_count: usize,
    pub skip_confirm: bool,
    pub skip_history: bool,
    pub temperature: f64,
    pub debug: bool,
    pub context_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_max_tokens: 0,
            openai_api_base: String::new(),
            openai_organization: String::new(),
            openai_proxy: String::new(),
            openai_api_version: "2023-05-15".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama-3.3-70b-versatile".to_string(),
            api_provider: "groq".to_string(),
            suggestion_count: 3,
            skip_confirm: false,
            skip_history: false,
            temperature: 0.05,
            debug: false,
            context_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from the platform config file and the process environment.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::resolve(Some(&config_path), &SystemEnvProvider)
    }

    /// Resolve configuration from an optional config file and an environment source.
    ///
    /// A missing file is not an error. A file that is not a JSON object of
    /// strings is a [`ShaiError::ConfigParse`].
    pub fn resolve(config_path: Option<&Path>, env: &dyn EnvProvider) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            match Self::read_config_file(path)? {
                Some(values) => {
                    info!("Loaded config from: {}", path.display());
                    config.apply(|key| values.get(key).cloned());
                }
                None => debug!("No config file at {}, using defaults", path.display()),
            }
        }

        // Environment variables override the config file; empty values count as unset
        config.apply(|key| env.var(key).filter(|value| !value.is_empty()));

        Ok(config)
    }

    fn read_config_file(path: &Path) -> Result<Option<HashMap<String, String>>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config file {}", path.display()));
            }
        };

        let values = serde_json::from_str(&content).map_err(|source| ShaiError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(values))
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        set_string(&mut self.openai_api_key, lookup("OPENAI_API_KEY"));
        set_string(&mut self.openai_model, lookup("OPENAI_MODEL"));
        set_parsed(&mut self.openai_max_tokens, lookup("OPENAI_MAX_TOKENS"), |v| v.parse().ok());
        set_string(&mut self.openai_api_base, lookup("OPENAI_API_BASE"));
        set_string(&mut self.openai_organization, lookup("OPENAI_ORGANIZATION"));
        set_string(&mut self.openai_proxy, lookup("OPENAI_PROXY"));
        set_string(&mut self.openai_api_version, lookup("OPENAI_API_VERSION"));
        set_string(&mut self.groq_api_key, lookup("GROQ_API_KEY"));
        set_string(&mut self.groq_model, lookup("GROQ_MODEL"));
        set_string(&mut self.api_provider, lookup("SHAI_API_PROVIDER"));
        set_parsed(&mut self.suggestion_count, lookup("SHAI_SUGGESTION_COUNT"), |v| v.parse().ok());
        set_parsed(&mut self.skip_confirm, lookup("SHAI_SKIP_CONFIRM"), parse_bool);
        set_parsed(&mut self.skip_history, lookup("SHAI_SKIP_HISTORY"), parse_bool);
        set_parsed(&mut self.temperature, lookup("SHAI_TEMPERATURE"), |v| v.parse().ok());
        set_parsed(&mut self.debug, lookup("DEBUG"), parse_bool);
        set_parsed(&mut self.context_mode, lookup("CTX"), parse_bool);
    }

    /// True when at least one provider has an API key.
    pub fn has_credentials(&self) -> bool {
        !self.openai_api_key.is_empty() || !self.groq_api_key.is_empty()
    }

    /// Fails with [`ShaiError::MissingCredentials`] when no API key is set.
    pub fn require_credentials(&self) -> Result<(), ShaiError> {
        if self.has_credentials() {
            Ok(())
        } else {
            Err(ShaiError::MissingCredentials)
        }
    }

    /// `~/.config/shell-ai/config.json`, or `%APPDATA%\shell-ai\config.json` on Windows.
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let base = if cfg!(windows) {
            dirs::config_dir().ok_or_else(|| anyhow!("Could not find application data directory"))?
        } else {
            home_dir()
                .ok_or_else(|| anyhow!("Could not find home directory"))?
                .join(".config")
        };
        Ok(base.join(CONFIG_APP_NAME))
    }

    pub fn show_config_info(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());
        println!(
            "Status: {}",
            if config_path.exists() { "Found" } else { "Not found (using defaults)" }
        );
        println!();
        println!("Provider: {}", self.api_provider);
        println!("OpenAI API Key: {}", if self.openai_api_key.is_empty() { "Not set" } else { "Set" });
        println!("OpenAI model: {}", self.openai_model);
        if !self.openai_api_base.is_empty() {
            println!("OpenAI API base: {}", self.openai_api_base);
        }
        if !self.openai_proxy.is_empty() {
            println!("OpenAI proxy: {}", self.openai_proxy);
        }
        println!("OpenAI API version: {}", self.openai_api_version);
        println!("Groq API Key: {}", if self.groq_api_key.is_empty() { "Not set" } else { "Set" });
        println!("Groq model: {}", self.groq_model);
        println!("Suggestions: {}", self.suggestion_count);
        println!("Temperature: {}", self.temperature);
        println!("Skip confirm: {}", self.skip_confirm);
        println!("Skip history: {}", self.skip_history);
        println!("Context mode: {}", self.context_mode);

        println!("\nTo set an API key:");
        println!("  export GROQ_API_KEY=<your-key>   (or OPENAI_API_KEY)");
        println!("Or add it to {}:", config_path.display());
        println!("  {{ \"GROQ_API_KEY\": \"<your-key>\" }}");

        Ok(())
    }
}

fn set_string(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_parsed<T>(field: &mut T, value: Option<String>, parse: impl Fn(&str) -> Option<T>) {
    if let Some(parsed) = value.as_deref().and_then(|v| parse(v.trim())) {
        *field = parsed;
    }
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

//! Chat-completion client for OpenAI- and Groq-compatible APIs.

use crate::config::Config;
use crate::error::ShaiError;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";
const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

const SHELL_COMMAND_SYSTEM_PROMPT: &str = "You are an expert at using shell commands. \
I need you to provide a response in the format `{\"command\": \"your_shell_command_here\"}`. \
Only provide a single executable line of shell code as the value for the \"command\" key. \
Never output any text outside the JSON structure. \
The command will be directly executed in a shell.";

/// LLM vendor selected by `SHAI_API_PROVIDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Groq,
}

impl FromStr for Provider {
    type Err = ShaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            other => Err(ShaiError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Groq => write!(f, "groq"),
        }
    }
}

/// Something that turns a natural-language request into a raw LLM answer
/// containing a shell command.
///
/// The suggestion generator only depends on this trait, so tests can stub
/// the LLM entirely.
#[async_trait]
pub trait ShellCommandGenerator: Send + Sync {
    /// Returns the unparsed completion for `user_prompt`, with `context`
    /// (previous command output) included when non-empty.
    async fn generate_shell_command(&self, user_prompt: &str, context: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Provider-specific request settings, resolved once at construction.
#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    api_key: String,
    model: String,
    organization: Option<String>,
}

impl Endpoint {
    fn for_provider(provider: Provider, config: &Config) -> Self {
        match provider {
            Provider::OpenAi => {
                let base = if config.openai_api_base.is_empty() {
                    OPENAI_DEFAULT_BASE
                } else {
                    config.openai_api_base.trim_end_matches('/')
                };
                Self {
                    url: format!("{}{}", base, CHAT_COMPLETIONS_PATH),
                    api_key: config.openai_api_key.clone(),
                    model: config.openai_model.clone(),
                    organization: Some(config.openai_organization.clone()).filter(|o| !o.is_empty()),
                }
            }
            Provider::Groq => Self {
                url: GROQ_CHAT_COMPLETIONS_URL.to_string(),
                api_key: config.groq_api_key.clone(),
                model: config.groq_model.clone(),
                organization: None,
            },
        }
    }
}

/// Client for the configured chat-completion provider.
pub struct LlmClient {
    provider: Provider,
    endpoint: Endpoint,
    temperature: f64,
    max_tokens: Option<u32>,
    http: Arc<dyn HttpClient>,
}

impl LlmClient {
    /// Creates a client backed by reqwest.
    ///
    /// # Errors
    ///
    /// Fails with [`ShaiError::UnsupportedProvider`] for an unknown provider
    /// key, or if the HTTP client cannot be built (e.g. a bad proxy URL).
    pub fn new(config: &Config) -> Result<Self> {
        let provider: Provider = config.api_provider.parse()?;
        let proxy = match provider {
            Provider::OpenAi if !config.openai_proxy.is_empty() => Some(config.openai_proxy.as_str()),
            _ => None,
        };
        let http = ReqwestHttpClient::new(proxy)?;
        Self::with_http_client(config, Arc::new(http))
    }

    /// Creates a client with an injected HTTP implementation.
    pub fn with_http_client(config: &Config, http: Arc<dyn HttpClient>) -> Result<Self> {
        let provider: Provider = config.api_provider.parse()?;
        let endpoint = Endpoint::for_provider(provider, config);
        info!("Using {} provider with model {}", provider, endpoint.model);

        Ok(Self {
            provider,
            endpoint,
            temperature: config.temperature,
            max_tokens: Some(config.openai_max_tokens).filter(|&n| n > 0),
            http,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Sends a system + user message pair and returns the first choice's content.
    ///
    /// # Errors
    ///
    /// - transport failures and timeouts from the HTTP client
    /// - [`ShaiError::ApiStatus`] for any status other than 200
    /// - a JSON error if the response envelope cannot be decoded
    /// - [`ShaiError::NoCompletions`] if the envelope has no choices
    pub async fn generate_completion(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                Message { role: "system", content: system_prompt },
                Message { role: "user", content: user_prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let body = serde_json::to_value(&request)?;

        let authorization = format!("Bearer {}", self.endpoint.api_key);
        let mut headers = vec![
            ("Content-Type", "application/json"),
            ("Authorization", authorization.as_str()),
        ];
        if let Some(organization) = &self.endpoint.organization {
            headers.push(("OpenAI-Organization", organization.as_str()));
        }

        debug!("POST {}", self.endpoint.url);
        let response = self
            .http
            .post_json(&self.endpoint.url, &headers, &body)
            .await
            .with_context(|| format!("request to {} failed", self.endpoint.url))?;

        if response.status != 200 {
            return Err(ShaiError::ApiStatus {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        debug!("LLM response: {}", response.body);
        let chat_response: ChatResponse =
            serde_json::from_str(&response.body).context("failed to decode API response")?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or(ShaiError::NoCompletions)?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl ShellCommandGenerator for LlmClient {
    async fn generate_shell_command(&self, user_prompt: &str, context: &str) -> Result<String> {
        let system_prompt = build_system_prompt(context);
        let user_prompt = format!(
            "Generate a shell command that satisfies this user request: {}",
            user_prompt
        );
        self.generate_completion(&system_prompt, &user_prompt).await
    }
}

fn build_system_prompt(context: &str) -> String {
    let mut prompt = format!("{} {}", SHELL_COMMAND_SYSTEM_PROMPT, platform_description());
    if !context.is_empty() {
        prompt.push_str(&format!(
            " Between [], these are the last {} tokens from the previous command's output, \
             you can use them as context: [{}]",
            context.chars().count(),
            context
        ));
    }
    prompt
}

fn platform_description() -> String {
    format!(
        "The system the shell command will be executed on is {}.",
        os_name(std::env::consts::OS)
    )
}

/// Human-readable name for a runtime OS identifier.
fn os_name(os: &str) -> &'static str {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" => "macOS",
        "linux" => "Linux",
        "windows" => "Windows",
        _ => "Unknown",
    }
}

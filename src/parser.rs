//! Extraction of the `{"command": "..."}` payload from raw LLM output.
//!
//! Models often wrap the JSON in a fenced markdown block or an inline code
//! span even when told not to. The first fenced block wins, then the first
//! inline span, then the whole text.

use crate::error::ShaiError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*\n([\s\S]*?)\n\s*```").expect("valid code block regex")
});

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"));

#[derive(Debug, Deserialize)]
struct CommandResponse {
    command: String,
}

/// Returns the `command` value from an LLM response.
///
/// # Errors
///
/// - [`ShaiError::NoContent`] if the response is blank
/// - [`ShaiError::ResponseParse`] if the selected text is not `{"command": string}` JSON
/// - [`ShaiError::EmptyCommand`] if the command is blank
///
/// # Example
///
/// ```
/// use shell_ai::parser::parse_llm_response;
///
/// let command = parse_llm_response("```json\n{\"command\": \"ls -la\"}\n```").unwrap();
/// assert_eq!(command, "ls -la");
/// ```
pub fn parse_llm_response(response: &str) -> Result<String, ShaiError> {
    let json_content = extract_json_from_markdown(response).unwrap_or_else(|| response.trim());
    if json_content.is_empty() {
        return Err(ShaiError::NoContent);
    }

    let parsed: CommandResponse =
        serde_json::from_str(json_content).map_err(ShaiError::ResponseParse)?;

    if parsed.command.trim().is_empty() {
        return Err(ShaiError::EmptyCommand);
    }
    Ok(parsed.command)
}

/// Content of the first fenced code block, else of the first inline code span.
fn extract_json_from_markdown(markdown: &str) -> Option<&str> {
    let first_capture = |re: &Regex| {
        re.captures(markdown)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|content| !content.is_empty())
    };

    first_capture(&CODE_BLOCK_RE).or_else(|| first_capture(&INLINE_CODE_RE))
}

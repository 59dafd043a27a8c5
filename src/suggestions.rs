//! Concurrent generation of candidate commands.
//!
//! One suggestion round fires `count` independent LLM requests with at most
//! [`MAX_CONCURRENT_REQUESTS`] in flight. A failing request never cancels
//! its siblings; the round only fails when nothing succeeded.

use crate::llm_client::ShellCommandGenerator;
use crate::parser::parse_llm_response;
use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const MAX_CONCURRENT_REQUESTS: usize = 4;

#[derive(Default)]
struct Accumulator {
    suggestions: Vec<String>,
    errors: Vec<anyhow::Error>,
}

pub struct SuggestionGenerator {
    client: Arc<dyn ShellCommandGenerator>,
}

impl SuggestionGenerator {
    pub fn new(client: Arc<dyn ShellCommandGenerator>) -> Self {
        Self { client }
    }

    /// Produces up to `count` distinct commands for `prompt`.
    ///
    /// `context` is the snapshot of previous command output for this round,
    /// shared read-only by every request.
    ///
    /// Commands are returned in completion order with duplicates removed.
    ///
    /// # Errors
    ///
    /// Returns the first recorded error when every request failed.
    pub async fn generate(&self, prompt: &str, count: usize, context: Option<&str>) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(count.min(MAX_CONCURRENT_REQUESTS)));
        let accumulator = Arc::new(Mutex::new(Accumulator::default()));
        let prompt: Arc<str> = Arc::from(prompt);
        let context: Arc<str> = Arc::from(context.unwrap_or_default());

        let mut tasks = JoinSet::new();
        for task_id in 0..count {
            let permit = semaphore.clone().acquire_owned().await?;
            let client = Arc::clone(&self.client);
            let accumulator = Arc::clone(&accumulator);
            let prompt = Arc::clone(&prompt);
            let context = Arc::clone(&context);

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = match client.generate_shell_command(&prompt, &context).await {
                    Ok(raw) => parse_llm_response(&raw).map_err(anyhow::Error::from),
                    Err(e) => Err(e),
                };

                let mut acc = accumulator.lock().unwrap_or_else(PoisonError::into_inner);
                match outcome {
                    Ok(command) if !command.is_empty() => {
                        debug!("Suggestion {} produced: {}", task_id, command);
                        acc.suggestions.push(command);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Suggestion {} failed: {:#}", task_id, e);
                        acc.errors.push(e);
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Suggestion task did not complete: {}", e);
                accumulator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .errors
                    .push(anyhow!("suggestion task did not complete: {}", e));
            }
        }

        let mut acc = accumulator.lock().unwrap_or_else(PoisonError::into_inner);
        let suggestions = std::mem::take(&mut acc.suggestions);
        if suggestions.is_empty() && !acc.errors.is_empty() {
            let first = acc.errors.swap_remove(0);
            return Err(first.context("failed to generate suggestions"));
        }

        Ok(deduplicate(suggestions))
    }
}

/// Removes repeated entries, keeping the first occurrence of each.
pub fn deduplicate(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns the next scripted response for each call, repeating the last one.
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicUsize,
        contexts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn always(response: &str) -> Arc<Self> {
            Self::new(vec![Ok(response)])
        }

        fn always_err(message: &str) -> Arc<Self> {
            Self::new(vec![Err(message)])
        }
    }

    #[async_trait]
    impl ShellCommandGenerator for ScriptedGenerator {
        async fn generate_shell_command(&self, _user_prompt: &str, context: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(context.to_string());
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            };
            next.map_err(|e| anyhow!(e))
        }
    }

    /// Tracks how many requests are in flight at once.
    struct SlowGenerator {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        counter: AtomicUsize,
    }

    #[async_trait]
    impl ShellCommandGenerator for SlowGenerator {
        async fn generate_shell_command(&self, _user_prompt: &str, _context: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{{\"command\": \"echo {}\"}}", n))
        }
    }

    fn slow_generator() -> Arc<SlowGenerator> {
        Arc::new(SlowGenerator {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_identical_responses_are_deduplicated() {
        let stub = ScriptedGenerator::always(r#"{"command": "ls -la"}"#);
        let generator = SuggestionGenerator::new(stub.clone());

        let suggestions = generator.generate("list files", 5, None).await.unwrap();

        assert_eq!(suggestions, vec!["ls -la".to_string()]);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_all_failures_fail_the_round() {
        let stub = ScriptedGenerator::always_err("boom");
        let generator = SuggestionGenerator::new(stub);

        let err = generator.generate("list files", 3, None).await.unwrap_err();

        assert!(err.to_string().contains("failed to generate suggestions"));
        assert!(format!("{:#}", err).contains("boom"));
    }

    #[tokio::test]
    async fn test_partial_failure_still_succeeds() {
        let stub = ScriptedGenerator::new(vec![
            Ok("`{\"command\": \"ls -la\"}`"),
            Err("rate limited"),
            Ok("{\"command\": \"ls -la\"}"),
        ]);
        let generator = SuggestionGenerator::new(stub.clone());

        let suggestions = generator.generate("list files", 3, None).await.unwrap();

        assert_eq!(suggestions, vec!["ls -la".to_string()]);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unparseable_responses_count_as_failures() {
        let stub = ScriptedGenerator::always("Sure! Try ls.");
        let generator = SuggestionGenerator::new(stub);

        let err = generator.generate("list files", 2, None).await.unwrap_err();

        assert!(format!("{:#}", err).contains("failed to parse command"));
    }

    #[tokio::test]
    async fn test_distinct_commands_each_appear_once() {
        let stub = ScriptedGenerator::new(vec![
            Ok(r#"{"command": "ls"}"#),
            Ok(r#"{"command": "ls -a"}"#),
            Ok(r#"{"command": "ls"}"#),
            Ok(r#"{"command": "find . -maxdepth 1"}"#),
        ]);
        let generator = SuggestionGenerator::new(stub);

        let mut suggestions = generator.generate("list files", 4, None).await.unwrap();
        suggestions.sort();

        assert_eq!(suggestions, vec!["find . -maxdepth 1", "ls", "ls -a"]);
    }

    #[tokio::test]
    async fn test_zero_count_makes_no_requests() {
        let stub = ScriptedGenerator::always(r#"{"command": "ls"}"#);
        let generator = SuggestionGenerator::new(stub.clone());

        assert!(generator.generate("list files", 0, None).await.unwrap().is_empty());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_context_snapshot_is_passed_to_every_request() {
        let stub = ScriptedGenerator::always(r#"{"command": "ls"}"#);
        let generator = SuggestionGenerator::new(stub.clone());

        generator.generate("again", 3, Some("3 files\n")).await.unwrap();

        let contexts = stub.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 3);
        assert!(contexts.iter().all(|c| c == "3 files\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_capped_at_four() {
        let stub = slow_generator();
        let generator = SuggestionGenerator::new(stub.clone());

        let suggestions = generator.generate("count", 10, None).await.unwrap();

        assert_eq!(suggestions.len(), 10);
        assert!(stub.max_in_flight.load(Ordering::SeqCst) <= MAX_CONCURRENT_REQUESTS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_capped_at_count() {
        let stub = slow_generator();
        let generator = SuggestionGenerator::new(stub.clone());

        generator.generate("count", 2, None).await.unwrap();

        assert!(stub.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence_order() {
        let items = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(deduplicate(items), vec!["b", "a", "c"]);
    }
}

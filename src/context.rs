//! Trailing-window buffer of recent command output, used in context mode.

use std::collections::VecDeque;

/// Maximum number of characters kept from the last command's output.
pub const MAX_CONTEXT_TOKENS: usize = 1500;

/// Holds the trailing characters of the most recently captured output.
///
/// Each [`append`](Self::append) replaces the previous contents, so after a
/// call the buffer holds exactly the last `min(len, capacity)` characters of
/// that chunk alone.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    tokens: VecDeque<char>,
    max_tokens: usize,
}

impl ContextBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CONTEXT_TOKENS)
    }

    pub fn with_capacity(max_tokens: usize) -> Self {
        Self {
            tokens: VecDeque::with_capacity(max_tokens),
            max_tokens,
        }
    }

    /// Pushes a single character, evicting the oldest one when full.
    pub fn push(&mut self, token: char) {
        if self.max_tokens == 0 {
            return;
        }
        if self.tokens.len() >= self.max_tokens {
            self.tokens.pop_front();
        }
        self.tokens.push_back(token);
    }

    /// Replaces the contents with the trailing window of `chunk`.
    pub fn append(&mut self, chunk: &str) {
        self.clear();
        for token in chunk.chars() {
            self.push(token);
        }
    }

    pub fn read(&self) -> String {
        self.tokens.iter().collect()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_tokens
    }
}

impl Default for ContextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

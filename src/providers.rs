//! Shared provider traits for dependency injection.
//!
//! Wall-clock time and the process environment are read through these
//! traits so that config resolution and history writing can be tested
//! without touching the real environment of the test process.

use std::collections::HashMap;

/// Trait for providing timestamps.
///
/// # Example
///
/// ```
/// use shell_ai::providers::{TimeProvider, SystemTimeProvider};
///
/// let provider = SystemTimeProvider;
/// assert!(provider.now() > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Default time provider using system time.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Trait for looking up environment variables.
pub trait EnvProvider: Send + Sync {
    /// Returns the value of `key`, or `None` when it is unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables, for tests and embedding.
///
/// ```
/// use shell_ai::providers::{EnvProvider, StaticEnvProvider};
///
/// let env = StaticEnvProvider::new([("SHELL", "/bin/zsh")]);
/// assert_eq!(env.var("SHELL").as_deref(), Some("/bin/zsh"));
/// assert_eq!(env.var("HOME"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticEnvProvider {
    vars: HashMap<String, String>,
}

impl StaticEnvProvider {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl EnvProvider for StaticEnvProvider {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::AssertionError;

/// A custom matcher: `(actual, args) -> passed`.
pub type Predicate = Arc<dyn Fn(&Value, &[Value]) -> bool + Send + Sync>;

/// Named matchers added at runtime. Lookups of unregistered names fail with
/// [`AssertionError::UnknownMatcher`].
#[derive(Clone, Default)]
pub struct MatcherRegistry {
    matchers: HashMap<String, Predicate>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `predicate` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.matchers.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn evaluate(&self, name: &str, actual: &Value, args: &[Value]) -> Result<bool, AssertionError> {
        let predicate = self
            .matchers
            .get(name)
            .ok_or_else(|| AssertionError::UnknownMatcher(name.to_string()))?;
        Ok(predicate(actual, args))
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.matchers.keys().collect();
        names.sort();
        f.debug_struct("MatcherRegistry").field("matchers", &names).finish()
    }
}

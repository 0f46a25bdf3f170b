use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use uuid::Uuid;

/// What a case effect or hook resolves to. Any error fails the case.
pub type CaseResult = anyhow::Result<()>;

pub type EffectFuture = BoxFuture<'static, CaseResult>;

/// A zero-argument async action. Stored as `Fn` so a registry can be run
/// more than once.
pub(crate) type Effect = Arc<dyn Fn() -> EffectFuture + Send + Sync>;

pub(crate) fn into_effect<F, Fut>(f: F) -> Effect
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CaseResult> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

pub struct TestCase {
    id: Uuid,
    description: String,
    effect: Effect,
    timeout: Option<Duration>,
}

impl TestCase {
    pub(crate) fn new(description: String, effect: Effect, timeout: Option<Duration>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            effect,
            timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn invoke(&self) -> EffectFuture {
        (self.effect)()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A before-each or after-each action.
pub struct Hook {
    effect: Effect,
    timeout: Option<Duration>,
}

impl Hook {
    pub(crate) fn new(effect: Effect, timeout: Option<Duration>) -> Self {
        Self { effect, timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn invoke(&self) -> EffectFuture {
        (self.effect)()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

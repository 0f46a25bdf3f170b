use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use super::case::{CaseResult, Hook, TestCase, into_effect};

/// A declared group: cases in execution order plus their shared hooks.
#[derive(Debug)]
pub struct TestGroup {
    id: Uuid,
    description: String,
    cases: Vec<TestCase>,
    before_each: Vec<Hook>,
    after_each: Vec<Hook>,
    timeout: Option<Duration>,
}

impl TestGroup {
    fn new(description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            cases: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            timeout: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn before_each_hooks(&self) -> &[Hook] {
        &self.before_each
    }

    pub fn after_each_hooks(&self) -> &[Hook] {
        &self.after_each
    }

    /// Default timeout for cases that do not set their own.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Handle given to a declaration callback. It only lives for the duration
/// of that callback, so a group cannot change once declared.
pub struct GroupBuilder {
    group: TestGroup,
}

impl GroupBuilder {
    pub(super) fn new(description: String) -> Self {
        Self {
            group: TestGroup::new(description),
        }
    }

    pub(super) fn finish(self) -> TestGroup {
        self.group
    }

    pub fn description(&self) -> &str {
        &self.group.description
    }

    pub fn it<F, Fut>(&mut self, description: impl Into<String>, effect: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.push_case(description.into(), None, effect)
    }

    pub fn it_with_timeout<F, Fut>(
        &mut self,
        description: impl Into<String>,
        timeout: Duration,
        effect: F,
    ) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.push_case(description.into(), Some(timeout), effect)
    }

    fn push_case<F, Fut>(
        &mut self,
        description: String,
        timeout: Option<Duration>,
        effect: F,
    ) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.group
            .cases
            .push(TestCase::new(description, into_effect(effect), timeout));
        self
    }

    pub fn before_each<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.group.before_each.push(Hook::new(into_effect(hook), None));
        self
    }

    pub fn before_each_with_timeout<F, Fut>(&mut self, timeout: Duration, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.group
            .before_each
            .push(Hook::new(into_effect(hook), Some(timeout)));
        self
    }

    pub fn after_each<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.group.after_each.push(Hook::new(into_effect(hook), None));
        self
    }

    pub fn after_each_with_timeout<F, Fut>(&mut self, timeout: Duration, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.group
            .after_each
            .push(Hook::new(into_effect(hook), Some(timeout)));
        self
    }

    /// Timeout applied to every case in this group that has none of its own.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.group.timeout = Some(timeout);
        self
    }
}

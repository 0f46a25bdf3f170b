//! Sequential execution of declared groups.
//!
//! Cases run strictly one at a time in declaration order. For every case the
//! group's before-each hooks run in order, then the effect (raced against
//! its timeout), then the after-each hooks. A failing before-each hook fails
//! the case and skips both the effect and the after-each hooks. Every error,
//! panic or timeout is contained at the case boundary.

mod step;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::models::{FailureDetail, FailureKind, GroupReport, RunReport, TestOutcome};
use crate::registry::{Registry, Selection, TestCase, TestGroup};

use step::run_step;

pub struct Engine {
    default_timeout: Option<Duration>,
    abort_tx: Arc<watch::Sender<bool>>,
}

/// Interrupts a running engine. Cloneable so it can be moved into a signal
/// handler.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// The case in flight is cancelled and recorded as interrupted; every
    /// case not yet reached is recorded as skipped. Only the current run is
    /// affected: the next run of the same engine starts fresh.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let (abort_tx, _) = watch::channel(false);
        Self {
            default_timeout: None,
            abort_tx: Arc::new(abort_tx),
        }
    }

    /// Timeout for cases whose case and group set none.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: Arc::clone(&self.abort_tx),
        }
    }

    pub async fn run(&self, registry: &Registry) -> RunReport {
        self.run_selected(registry, &Selection::all()).await
    }

    pub async fn run_selected(&self, registry: &Registry, selection: &Selection) -> RunReport {
        let groups = registry.select(selection);
        if groups.is_empty() && !selection.is_all() {
            tracing::warn!(selected = ?selection.names(), "no declared group matches the selection");
        }
        self.run_groups(&groups).await
    }

    pub async fn run_groups(&self, groups: &[&TestGroup]) -> RunReport {
        let started = Instant::now();
        self.abort_tx.send_replace(false);
        let mut abort = self.abort_tx.subscribe();

        let mut reports = Vec::with_capacity(groups.len());
        for group in groups {
            reports.push(self.run_group(group, &mut abort).await);
        }

        let report = RunReport::new(reports, elapsed_ms(started));
        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        report
    }

    async fn run_group(
        &self,
        group: &TestGroup,
        abort: &mut watch::Receiver<bool>,
    ) -> GroupReport {
        tracing::info!(
            group = group.description(),
            cases = group.cases().len(),
            "running group"
        );
        let mut report = GroupReport::start(group.id(), group.description());

        for case in group.cases() {
            let outcome = if *abort.borrow() {
                TestOutcome::skipped(case.id(), case.description())
            } else {
                self.run_case(group, case, abort).await
            };
            tracing::debug!(
                group = group.description(),
                case = case.description(),
                status = outcome.status.label(),
                duration_ms = outcome.duration_ms,
                "case finished"
            );
            report.record(outcome);
        }

        report.seal()
    }

    async fn run_case(
        &self,
        group: &TestGroup,
        case: &TestCase,
        abort: &mut watch::Receiver<bool>,
    ) -> TestOutcome {
        let started = Instant::now();
        let failure = self.exercise(group, case, abort).await;
        let duration_ms = elapsed_ms(started);

        match failure {
            None => TestOutcome::passed(case.id(), case.description(), duration_ms),
            Some(failure) => {
                TestOutcome::failed(case.id(), case.description(), duration_ms, failure)
            }
        }
    }

    /// Hooks and effect for one case. Returns the first failure, if any.
    async fn exercise(
        &self,
        group: &TestGroup,
        case: &TestCase,
        abort: &mut watch::Receiver<bool>,
    ) -> Option<FailureDetail> {
        for hook in group.before_each_hooks() {
            if let Err(failure) = run_step(hook.invoke(), hook.timeout(), abort).await {
                return Some(failure);
            }
        }

        let timeout = case
            .timeout()
            .or(group.timeout())
            .or(self.default_timeout);
        let mut failure = run_step(case.invoke(), timeout, abort).await.err();

        for hook in group.after_each_hooks() {
            if is_interrupted(&failure) {
                break;
            }
            if let Err(hook_failure) = run_step(hook.invoke(), hook.timeout(), abort).await {
                failure.get_or_insert(hook_failure);
            }
        }

        failure
    }
}

fn is_interrupted(failure: &Option<FailureDetail>) -> bool {
    failure
        .as_ref()
        .is_some_and(|f| f.kind == FailureKind::Interrupted)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

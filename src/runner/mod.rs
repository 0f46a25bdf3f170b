mod bundle;
mod in_process;
mod native;
mod process;
mod sandbox;

pub use bundle::{BundleError, Bundler, CommandBundler};
pub use in_process::InProcessRunner;
pub use native::NativeRunner;
pub use sandbox::{SandboxError, SandboxRunner};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RunReport;
use crate::registry::Selection;

/// Collector base URL handed to a test artifact that should submit its report.
pub const COLLECTOR_URL_ENV: &str = "TETHER_COLLECTOR_URL";

/// JSON array of group descriptions to run. Absent means all groups.
pub const GROUPS_ENV: &str = "TETHER_GROUPS";

/// How a run ended.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The report reached this process.
    Reported(RunReport),
    /// The artifact reported on its own; only its exit code is known.
    Exited(i32),
}

impl Completion {
    /// `0` when everything passed, `1` when any case failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            Completion::Reported(report) if report.has_failures() => 1,
            Completion::Reported(_) => 0,
            Completion::Exited(code) => *code,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Completion::Reported(report) => Some(report),
            Completion::Exited(_) => None,
        }
    }
}

/// An environment that can execute the declared tests.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the selected groups to completion.
    async fn run(&self, selection: &Selection) -> Result<Completion>;

    /// Display name for this runner (e.g., "sandbox").
    fn name(&self) -> &str;
}

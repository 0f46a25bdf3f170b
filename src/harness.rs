//! Entry point for test binaries.
//!
//! A test binary declares its groups and hands the registry to [`main`] (or
//! to [`run`] from an existing runtime). When `TETHER_COLLECTOR_URL` is set
//! the report is submitted to that collector; otherwise it is printed.
//!
//! ```no_run
//! use tether::assert::expect;
//!
//! fn main() -> std::process::ExitCode {
//!     tether::harness::main(|registry| {
//!         registry.describe("math", |group| {
//!             group.it("adds", || async {
//!                 expect(1 + 1).to_be(2)?;
//!                 Ok(())
//!             });
//!         });
//!     })
//! }
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::collector::Submitter;
use crate::engine::Engine;
use crate::printer::{ConsolePrinter, ReportPrinter};
use crate::registry::{Registry, Selection};
use crate::runner::{COLLECTOR_URL_ENV, GROUPS_ENV};

/// Install the `tracing` subscriber. `RUST_LOG` overrides `default`.
/// Later calls are no-ops.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build the registry with `declare`, run it on a fresh runtime, and return
/// the process exit code.
pub fn main<F>(declare: F) -> ExitCode
where
    F: FnOnce(&mut Registry),
{
    init_tracing("warn");

    let mut registry = Registry::new();
    declare(&mut registry);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start the async runtime: {err}");
            return ExitCode::from(2);
        }
    };
    runtime.block_on(run(registry))
}

/// Run every selected group. `0` when all passed, `1` on any failure, `2`
/// when the report could not be produced or delivered.
pub async fn run(registry: Registry) -> ExitCode {
    match execute(registry).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn execute(registry: Registry) -> Result<bool> {
    let selection = match std::env::var(GROUPS_ENV) {
        Ok(raw) => {
            Selection::from_env(&raw).with_context(|| format!("invalid {GROUPS_ENV}: {raw}"))?
        }
        Err(_) => Selection::all(),
    };

    tracing::debug!(
        groups = registry.len(),
        cases = registry.case_count(),
        selected = ?selection.names(),
        "tests declared"
    );
    let engine = Engine::new();
    let abort = engine.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, aborting run");
            abort.abort();
        }
    });
    let report = engine.run_selected(&registry, &selection).await;
    interrupt.abort();

    match std::env::var(COLLECTOR_URL_ENV) {
        Ok(url) if !url.is_empty() => {
            Submitter::new(&url)?
                .submit(&report)
                .await
                .context("failed to deliver report")?;
            tracing::info!(%url, "report delivered to collector");
        }
        _ => ConsolePrinter::stdout()
            .print(&report)
            .context("failed to print report")?,
    }

    Ok(!report.has_failures())
}

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::bundle::Bundler;
use super::process::{self, ChildGuard};
use super::{COLLECTOR_URL_ENV, Completion, GROUPS_ENV, Runner};
use crate::collector::{Collector, CollectorError};
use crate::config::ServerConfig;
use crate::models::RunReport;
use crate::registry::Selection;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox command is not configured (set [sandbox] command in tether.toml)")]
    NotConfigured,

    #[error("invalid sandbox command")]
    InvalidCommand(#[source] shell_words::ParseError),

    #[error("sandbox command is empty")]
    EmptyCommand,

    #[error("failed to spawn sandbox `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("sandbox exited ({status}) without delivering a report")]
    ExitedWithoutReport { status: String },
}

/// Runs the bundled tests inside an isolated environment and receives the
/// report through a [`Collector`].
pub struct SandboxRunner {
    command: String,
    workspace: PathBuf,
    server: ServerConfig,
    exit_grace: Duration,
    bundler: Option<Box<dyn Bundler>>,
}

impl SandboxRunner {
    /// `command` may contain `{url}`, replaced with the collector's URL.
    pub fn new(
        command: impl Into<String>,
        workspace: impl Into<PathBuf>,
        server: ServerConfig,
    ) -> Self {
        Self {
            command: command.into(),
            workspace: workspace.into(),
            server,
            exit_grace: Duration::from_secs(2),
            bundler: None,
        }
    }

    /// Build the artifact before each run.
    pub fn with_bundler(mut self, bundler: impl Bundler + 'static) -> Self {
        self.bundler = Some(Box::new(bundler));
        self
    }

    /// How long a late delivery is still accepted after the sandbox exits.
    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// One invocation against a collector the caller owns, so the caller can
    /// keep it serving after the report arrives.
    pub async fn run_against(
        &self,
        collector: &mut Collector,
        selection: &Selection,
    ) -> Result<RunReport> {
        if let Some(bundler) = &self.bundler {
            bundler.bundle().await.context("bundling failed")?;
        }

        collector.begin()?;
        let url = collector.url();
        let url_arg = [url.clone()];
        let argv = process::expand(&self.command, &[("{url}", url_arg.as_slice())])
            .map_err(SandboxError::InvalidCommand)?;
        let (program, args) = argv.split_first().ok_or(SandboxError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .env(COLLECTOR_URL_ENV, &url);
        if !selection.is_all() {
            command.env(GROUPS_ENV, selection.to_env());
        }

        let mut child = ChildGuard::spawn(command).map_err(|source| SandboxError::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::info!(program = %program, %url, "sandbox started");

        let report = tokio::select! {
            delivered = collector.await_delivery(self.server.delivery_timeout()) => delivered?,
            exited = child.wait() => {
                let status = exited.context("failed to wait for sandbox")?;
                tracing::debug!(%status, "sandbox exited, waiting for a late delivery");
                match collector.await_delivery(Some(self.exit_grace)).await {
                    Ok(report) => report,
                    Err(CollectorError::DeliveryTimeout(_)) => {
                        return Err(SandboxError::ExitedWithoutReport {
                            status: status.to_string(),
                        }
                        .into());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        drop(child);
        Ok(report)
    }
}

#[async_trait]
impl Runner for SandboxRunner {
    /// Binds a collector for this run and closes it before returning, so the
    /// report is printed after the collector is gone. Use
    /// [`SandboxRunner::run_against`] to keep it open while printing.
    async fn run(&self, selection: &Selection) -> Result<Completion> {
        let mut collector = Collector::bind(&self.server).await?;
        let result = self.run_against(&mut collector, selection).await;
        let closed = collector.close().await;
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "collector did not shut down cleanly");
                }
                return Err(err);
            }
        };
        closed?;
        Ok(Completion::Reported(report))
    }

    fn name(&self) -> &str {
        "sandbox"
    }
}

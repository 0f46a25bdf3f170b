use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::process::{self, ChildGuard};
use super::{COLLECTOR_URL_ENV, Completion, GROUPS_ENV, Runner};
use crate::registry::Selection;

/// Runs a compiled test artifact as a child process. The artifact prints its
/// own report to the inherited stdout, so only its exit code comes back.
#[derive(Debug, Clone)]
pub struct NativeRunner {
    command: String,
    workspace: PathBuf,
}

impl NativeRunner {
    pub fn new(command: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl Runner for NativeRunner {
    async fn run(&self, selection: &Selection) -> Result<Completion> {
        let argv = process::expand(&self.command, &[])
            .with_context(|| format!("invalid native command `{}`", self.command))?;
        let (program, args) = argv.split_first().context("native command is empty")?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .env_remove(COLLECTOR_URL_ENV);
        if !selection.is_all() {
            command.env(GROUPS_ENV, selection.to_env());
        }

        tracing::info!(program = %program, "starting native test run");
        let mut child = ChildGuard::spawn(command)
            .with_context(|| format!("failed to spawn `{}`", program))?;
        let status = child
            .wait()
            .await
            .with_context(|| format!("failed to wait for `{}`", program))?;

        Ok(Completion::Exited(process::exit_code(status)))
    }

    fn name(&self) -> &str {
        "native"
    }
}

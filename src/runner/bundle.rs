use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::process::{self, ChildGuard};
use crate::config::BundleConfig;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundler command is not configured (set [bundle] command in tether.toml)")]
    NotConfigured,

    #[error("invalid entry pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("no entry files match {0:?}")]
    NoEntries(Vec<String>),

    #[error("invalid bundler command")]
    InvalidCommand(#[source] shell_words::ParseError),

    #[error("bundler command is empty")]
    EmptyCommand,

    #[error("failed to prepare {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run bundler `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("bundler exited with {0}")]
    Failed(std::process::ExitStatus),
}

/// Produces the artifact the sandbox loads.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Build the artifact and return its path.
    async fn bundle(&self) -> Result<PathBuf, BundleError>;
}

/// Runs an external bundler command line.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: String,
    entry: Vec<String>,
    output: PathBuf,
    workspace: PathBuf,
}

impl CommandBundler {
    pub fn new(
        command: impl Into<String>,
        entry: Vec<String>,
        output: impl Into<PathBuf>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            entry,
            output: output.into(),
            workspace: workspace.into(),
        }
    }

    pub fn from_config(config: &BundleConfig, workspace: &Path) -> Result<Self, BundleError> {
        let command = config.command.clone().ok_or(BundleError::NotConfigured)?;
        Ok(Self::new(
            command,
            config.entry.clone(),
            config.output.clone(),
            workspace,
        ))
    }

    pub fn output(&self) -> PathBuf {
        self.workspace.join(&self.output)
    }

    /// Files matched by the entry globs, sorted and deduplicated.
    pub fn resolve_entries(&self) -> Result<Vec<PathBuf>, BundleError> {
        let mut files = Vec::new();
        for pattern in &self.entry {
            let full = self.workspace.join(pattern);
            let paths = glob::glob(&full.to_string_lossy()).map_err(|source| {
                BundleError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            for path in paths {
                match path {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "skipping unreadable entry"),
                }
            }
        }
        files.sort();
        files.dedup();

        if files.is_empty() && !self.entry.is_empty() {
            return Err(BundleError::NoEntries(self.entry.clone()));
        }
        Ok(files)
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn bundle(&self) -> Result<PathBuf, BundleError> {
        let entries: Vec<String> = self
            .resolve_entries()?
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        let output = self.output();
        let output_arg = [output.to_string_lossy().into_owned()];

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BundleError::Output {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let argv = process::expand(
            &self.command,
            &[
                ("{entry}", entries.as_slice()),
                ("{output}", output_arg.as_slice()),
            ],
        )
        .map_err(BundleError::InvalidCommand)?;
        let (program, args) = argv.split_first().ok_or(BundleError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.workspace)
            .stdin(Stdio::null());

        tracing::info!(program = %program, entries = entries.len(), "bundling");
        let mut child = ChildGuard::spawn(command).map_err(|source| BundleError::Spawn {
            program: program.clone(),
            source,
        })?;
        let status = child.wait().await.map_err(|source| BundleError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(BundleError::Failed(status));
        }

        tracing::debug!(output = %output.display(), "bundle ready");
        Ok(output)
    }
}

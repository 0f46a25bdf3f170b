use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::collector::Collector;
use crate::config::{Config, RunnerKind};
use crate::models::RunReport;
use crate::printer::{ConsolePrinter, ReportPrinter};
use crate::registry::Selection;
use crate::runner::{CommandBundler, NativeRunner, Runner, SandboxError, SandboxRunner};

#[derive(Debug, Parser)]
#[command(
    name = "tether",
    version,
    about = "Run tests natively or in a sandbox and collect one report"
)]
pub struct Cli {
    /// Config file to use instead of ./tether.toml
    #[arg(short, long, global = true, env = "TETHER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the test suite with the configured runners
    Run(RunArgs),
    /// Start a collector and print the first report delivered to it
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run the native test artifact
    #[arg(long)]
    pub native: bool,

    /// Run the bundled tests in the sandbox
    #[arg(long)]
    pub sandbox: bool,

    /// Bundle before starting the sandbox
    #[arg(long)]
    pub bundle: bool,

    /// Only run the group with this description (repeatable)
    #[arg(short = 'g', long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Collector port (0 picks a free one)
    #[arg(long)]
    pub port: Option<u16>,

    /// Keep the collector serving after the report is printed, until Ctrl-C
    #[arg(long)]
    pub linger: bool,
}

impl ServerArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.linger {
            config.server.linger = true;
        }
    }
}

/// Execute a parsed command line and return the process exit code.
pub async fn execute(cli: Cli) -> Result<u8> {
    let workspace = std::env::current_dir().context("failed to resolve working directory")?;
    let mut config = match &cli.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(&workspace)?,
    };

    match cli.command {
        Command::Run(args) => {
            args.server.apply(&mut config);
            run(&args, &config, &workspace).await
        }
        Command::Serve(args) => {
            args.server.apply(&mut config);
            serve(&config).await
        }
    }
}

async fn run(args: &RunArgs, config: &Config, workspace: &Path) -> Result<u8> {
    let kinds = if args.native || args.sandbox {
        let mut kinds = Vec::new();
        if args.native {
            kinds.push(RunnerKind::Native);
        }
        if args.sandbox {
            kinds.push(RunnerKind::Sandbox);
        }
        kinds
    } else {
        config.runners.clone()
    };
    if kinds.is_empty() {
        anyhow::bail!("no runner selected (pass --native or --sandbox, or set `runners` in tether.toml)");
    }
    if args.bundle && !kinds.contains(&RunnerKind::Sandbox) {
        tracing::warn!("--bundle only applies to the sandbox runner");
    }

    let selection = Selection::groups(args.groups.iter().cloned());
    let mut worst = 0;
    for kind in kinds {
        let code = match kind {
            RunnerKind::Native => run_native(config, workspace, &selection).await?,
            RunnerKind::Sandbox => run_sandbox(args, config, workspace, &selection).await?,
        };
        worst = worst.max(code);
    }
    Ok(worst)
}

async fn run_native(config: &Config, workspace: &Path, selection: &Selection) -> Result<u8> {
    let command = config
        .native
        .command
        .as_deref()
        .context("native command is not configured (set [native] command in tether.toml)")?;
    let runner = NativeRunner::new(command, workspace);
    let completion = runner
        .run(selection)
        .await
        .with_context(|| format!("{} run failed", runner.name()))?;
    Ok(to_exit_code(completion.exit_code()))
}

async fn run_sandbox(
    args: &RunArgs,
    config: &Config,
    workspace: &Path,
    selection: &Selection,
) -> Result<u8> {
    let command = config
        .sandbox
        .command
        .as_deref()
        .ok_or(SandboxError::NotConfigured)?;
    let mut runner = SandboxRunner::new(command, workspace, config.server.clone())
        .with_exit_grace(config.sandbox.exit_grace());
    if args.bundle {
        runner = runner.with_bundler(CommandBundler::from_config(&config.bundle, workspace)?);
    }

    let mut collector = Collector::bind(runner.server()).await?;
    let result = tokio::select! {
        result = runner.run_against(&mut collector, selection) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("interrupted")),
    };
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            collector.close().await?;
            return Err(err.context("sandbox run failed"));
        }
    };

    print(&report)?;
    finish(&mut collector, config).await?;
    Ok(exit_code_for(&report))
}

async fn serve(config: &Config) -> Result<u8> {
    let mut collector = Collector::bind(&config.server).await?;
    collector.begin()?;
    println!("Collector listening on {}", collector.url());

    let report = tokio::select! {
        delivered = collector.await_delivery(config.server.delivery_timeout()) => delivered?,
        _ = tokio::signal::ctrl_c() => {
            collector.close().await?;
            anyhow::bail!("interrupted before a report was delivered");
        }
    };

    print(&report)?;
    finish(&mut collector, config).await?;
    Ok(exit_code_for(&report))
}

fn print(report: &RunReport) -> Result<()> {
    ConsolePrinter::stdout()
        .print(report)
        .context("failed to print report")
}

/// Close the collector, or keep it serving until Ctrl-C when lingering.
async fn finish(collector: &mut Collector, config: &Config) -> Result<()> {
    if config.server.linger {
        println!(
            "Collector still serving at {} (press Ctrl-C to stop)",
            collector.url()
        );
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
    }
    collector.close().await?;
    Ok(())
}

fn exit_code_for(report: &RunReport) -> u8 {
    if report.has_failures() { 1 } else { 0 }
}

fn to_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(2)
}

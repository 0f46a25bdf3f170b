use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "tether.toml";

/// Reports with thousands of failures and stacks run well past axum's 2 MB default.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Runners used by `tether run` when no runner flag is given.
    pub runners: Vec<RunnerKind>,
    pub native: NativeConfig,
    pub sandbox: SandboxConfig,
    pub bundle: BundleConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    Native,
    Sandbox,
}

/// The test artifact run as a plain child process.
/// Example: `command = "cargo run --quiet --bin suite"`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeConfig {
    pub command: Option<String>,
}

/// The isolated environment that loads the bundled tests and reports back.
/// `{url}` in `command` is replaced with the collector URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    pub command: Option<String>,
    /// How long to keep waiting for a delivery after the sandbox exits.
    pub exit_grace_secs: u64,
}

/// Bundler invocation. `{entry}` expands to every file matched by the `entry`
/// globs, `{output}` to `output`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    pub command: Option<String>,
    pub entry: Vec<String>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    /// `0` picks an ephemeral port.
    pub port: u16,
    /// Directory served under `/assets`; its `index.html` replaces the built-in page.
    pub assets: Option<PathBuf>,
    /// Upper bound on waiting for a delivery. `0` waits forever.
    pub delivery_timeout_secs: u64,
    /// Keep serving after the report is printed until Ctrl-C.
    pub linger: bool,
    /// Largest `/submit` body accepted. `0` removes the limit.
    pub max_payload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runners: vec![RunnerKind::Native],
            native: NativeConfig::default(),
            sandbox: SandboxConfig::default(),
            bundle: BundleConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: None,
            exit_grace_secs: 2,
        }
    }
}

impl SandboxConfig {
    pub fn exit_grace(&self) -> Duration {
        Duration::from_secs(self.exit_grace_secs)
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            command: None,
            entry: Vec::new(),
            output: PathBuf::from("target/tether/bundle.js"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            assets: Some(PathBuf::from("target/tether")),
            delivery_timeout_secs: 300,
            linger: false,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn max_payload(&self) -> Option<usize> {
        (self.max_payload_bytes > 0).then_some(self.max_payload_bytes)
    }

    pub fn delivery_timeout(&self) -> Option<Duration> {
        (self.delivery_timeout_secs > 0).then(|| Duration::from_secs(self.delivery_timeout_secs))
    }
}

impl Config {
    /// Load `tether.toml` from the workspace root, falling back to defaults if
    /// absent. A file that exists but does not parse is an error.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                Self::parse(&content).with_context(|| format!("invalid {}", path.display()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Load an explicitly named config file, which must exist.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

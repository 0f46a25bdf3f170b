use anyhow::Result;
use async_trait::async_trait;

use super::{Completion, Runner};
use crate::engine::{AbortHandle, Engine};
use crate::registry::{Registry, Selection};

/// Runs the registry on the current tokio runtime.
pub struct InProcessRunner {
    registry: Registry,
    engine: Engine,
}

impl InProcessRunner {
    pub fn new(registry: Registry) -> Self {
        Self::with_engine(registry, Engine::new())
    }

    pub fn with_engine(registry: Registry, engine: Engine) -> Self {
        Self { registry, engine }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.engine.abort_handle()
    }
}

#[async_trait]
impl Runner for InProcessRunner {
    async fn run(&self, selection: &Selection) -> Result<Completion> {
        let report = self.engine.run_selected(&self.registry, selection).await;
        Ok(Completion::Reported(report))
    }

    fn name(&self) -> &str {
        "in-process"
    }
}

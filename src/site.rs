use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::graph::{run_graph, TaskGraph, TaskRunner};
use crate::models::{Target, Task};
use crate::notification::{LogNotifier, Notifier};
use crate::server::{self, ServerHandle};
use crate::steps::Pipeline;
use crate::watch::{self, WatchHandle};

/// A site on disk and everything needed to run any of its targets.
#[derive(Clone)]
pub struct Site {
    config: Config,
    pipeline: Pipeline,
}

impl Site {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let pipeline = Pipeline::new(config.layout.clone(), notifier);
        Self { config, pipeline }
    }

    pub fn with_log(config: Config) -> Self {
        Self::new(config, Arc::new(LogNotifier))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run `target` to completion. `watch`, `server` and `default` only
    /// return on a fatal error.
    pub async fn run_target(&self, target: Target) -> Result<()> {
        tracing::info!("Running '{}'", target);
        run_graph(&TaskGraph::for_target(target), self).await
    }

    pub fn start_watch(&self) -> Result<WatchHandle> {
        watch::start_watch(
            watch::source_subscriptions(&self.config.layout),
            Arc::new(self.pipeline.clone()),
            self.config.watch,
        )
    }

    pub async fn start_server(&self) -> Result<ServerHandle> {
        server::start_server(self.config.layout.output_dir(), self.config.server).await
    }
}

#[async_trait]
impl TaskRunner for Site {
    async fn run(&self, task: Task) -> Result<()> {
        match task {
            Task::Watch => {
                let mut handle = self.start_watch()?;
                handle.wait().await
            }
            Task::Server => {
                let mut handle = self.start_server().await?;
                handle.wait().await
            }
            step => self.pipeline.run(step).await,
        }
    }
}

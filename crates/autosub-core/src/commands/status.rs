//! Status command implementation.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::deploy::{PollEvent, StatusPoller};
use crate::notify::{Notifier, TracingNotifier};
use crate::types::{B256, TaskStatus};

/// Options for querying a deployment task
#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub task_id: String,
    /// Keep polling until the task reaches a terminal status
    pub watch: bool,
}

impl StatusOptions {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            watch: false,
        }
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub task_id: String,
    pub status: TaskStatus,
    pub terminal: bool,
    pub tx_hash: Option<B256>,
    pub explorer_url: Option<String>,
}

pub struct StatusCommand {
    ctx: AppContext,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
}

impl StatusCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            notifier: Arc::new(TracingNotifier),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Cancelling `token` stops a watch.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn execute(&self, options: &StatusOptions) -> anyhow::Result<StatusReport> {
        let settings = self.ctx.settings()?;
        let mut poller = StatusPoller::new(
            self.ctx.deployer_api(&settings)?,
            self.notifier.clone(),
            settings.explorer_url.clone(),
            settings.chain_id,
        )
        .with_interval(settings.poll_interval)
        .with_timeout(settings.poll_timeout);

        if !options.watch {
            let task = poller
                .check(&options.task_id)
                .await
                .with_context(|| format!("Failed to query task {}", options.task_id))?;
            return Ok(StatusReport {
                explorer_url: task.output_tx_hash.map(|hash| poller.explorer_link(hash)),
                terminal: task.status.is_terminal(),
                task_id: task.task_id,
                status: task.status,
                tx_hash: task.output_tx_hash,
            });
        }

        if let Some(indexer) = self.ctx.indexer(&settings)? {
            poller = poller.with_indexer(indexer);
        }
        let mut handle = poller.spawn(options.task_id.clone(), &self.cancel);
        while let Some(event) = handle.next_event().await {
            match event {
                PollEvent::Observed(task) => {
                    tracing::info!(task_id = %task.task_id, status = %task.status, "task in progress");
                }
                PollEvent::Terminal { task, explorer_url } => {
                    return Ok(StatusReport {
                        task_id: task.task_id,
                        status: task.status,
                        terminal: true,
                        tx_hash: task.output_tx_hash,
                        explorer_url,
                    });
                }
                PollEvent::TimedOut { elapsed } => {
                    anyhow::bail!(
                        "Task {} did not settle within {}s",
                        options.task_id,
                        elapsed.as_secs()
                    );
                }
            }
        }
        anyhow::bail!("Stopped watching task {}", options.task_id)
    }
}

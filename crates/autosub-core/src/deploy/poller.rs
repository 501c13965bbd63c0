//! Task status poller.
//!
//! One poll loop runs per task id on its own tokio task. The loop stops on
//! the first terminal status, on timeout, or when its [`PollHandle`] is
//! cancelled or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{DeployerApi, IndexerTrigger, TaskStatusResponse};
use crate::error::Result;
use crate::notify::{Notice, Notifier};
use crate::types::{B256, ChainId, DeploymentTask, TaskStatus};

/// Progress reported by a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A non-terminal status was observed.
    Observed(DeploymentTask),
    /// The task reached a terminal status; no further polls follow.
    Terminal {
        task: DeploymentTask,
        explorer_url: Option<String>,
    },
    /// No terminal status within the configured timeout.
    TimedOut { elapsed: Duration },
}

#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn DeployerApi>,
    indexer: Option<Arc<dyn IndexerTrigger>>,
    notifier: Arc<dyn Notifier>,
    explorer_url: Url,
    chain_id: ChainId,
    interval: Duration,
    timeout: Option<Duration>,
}

impl StatusPoller {
    pub fn new(
        api: Arc<dyn DeployerApi>,
        notifier: Arc<dyn Notifier>,
        explorer_url: Url,
        chain_id: ChainId,
    ) -> Self {
        Self {
            api,
            indexer: None,
            notifier,
            explorer_url,
            chain_id,
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn IndexerTrigger>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query the task status once.
    pub async fn check(&self, task_id: &str) -> Result<DeploymentTask> {
        let response = self.api.task_status(task_id).await?;
        to_task(task_id, response)
    }

    /// Explorer link for a transaction hash.
    pub fn explorer_link(&self, tx_hash: B256) -> String {
        let base = self.explorer_url.as_str().trim_end_matches('/');
        format!("{base}/tx/{tx_hash}")
    }

    /// Start polling `task_id` on a background task.
    ///
    /// The loop is cancelled together with `parent`.
    pub fn spawn(&self, task_id: String, parent: &CancellationToken) -> PollHandle {
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = self.clone();
        let token = cancel.clone();
        let id = task_id.clone();
        let join = tokio::spawn(async move { poller.poll_loop(id, tx, token).await });

        PollHandle {
            task_id,
            events: rx,
            cancel,
            join,
        }
    }

    async fn poll_loop(
        self,
        task_id: String,
        events: mpsc::UnboundedSender<PollEvent>,
        cancel: CancellationToken,
    ) {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<TaskStatus> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(%task_id, "poll loop cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Some(limit) = self.timeout
                && started.elapsed() >= limit
            {
                tracing::warn!(%task_id, elapsed_secs = started.elapsed().as_secs(), "polling timed out");
                let _ = events.send(PollEvent::TimedOut {
                    elapsed: started.elapsed(),
                });
                return;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.check(&task_id) => result,
            };

            let task = match result {
                Ok(task) => task,
                Err(err) => {
                    tracing::warn!(%task_id, error = %err, "status poll failed, will retry");
                    continue;
                }
            };

            if last_status != Some(task.status) {
                self.notifier.notify(Notice::task_status(task.status));
                last_status = Some(task.status);
            }

            if task.status.is_terminal() {
                let explorer_url = self.on_terminal(&task).await;
                if cancel.is_cancelled() {
                    return;
                }
                let _ = events.send(PollEvent::Terminal { task, explorer_url });
                return;
            }

            tracing::debug!(%task_id, status = %task.status, "task still running");
            if events.send(PollEvent::Observed(task)).is_err() {
                return;
            }
        }
    }

    /// Side effects of a terminal status; returns the explorer link.
    async fn on_terminal(&self, task: &DeploymentTask) -> Option<String> {
        if task.status != TaskStatus::Successful {
            tracing::warn!(task_id = %task.task_id, status = %task.status, "deployment task did not succeed");
            return None;
        }
        let tx_hash = task.output_tx_hash?;
        let link = self.explorer_link(tx_hash);
        tracing::info!(task_id = %task.task_id, %tx_hash, explorer = %link, "deployment succeeded");

        if let Some(indexer) = &self.indexer
            && let Err(err) = indexer.trigger(tx_hash, self.chain_id).await
        {
            tracing::warn!(%tx_hash, error = %err, "failed to trigger indexer");
        }
        Some(link)
    }
}

fn to_task(task_id: &str, response: TaskStatusResponse) -> Result<DeploymentTask> {
    let status: TaskStatus = response
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()?;
    let output_tx_hash = match response.output_transaction_hash.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<B256>() {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::warn!(%task_id, hash = raw, error = %err, "ignoring malformed output hash");
                None
            }
        },
    };
    Ok(DeploymentTask {
        task_id: response
            .task_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| task_id.to_string()),
        status,
        output_tx_hash,
    })
}

/// Owner of a running poll loop. Dropping the handle stops the loop.
pub struct PollHandle {
    task_id: String,
    events: mpsc::UnboundedReceiver<PollEvent>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl PollHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Next event, or `None` once the loop has stopped.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

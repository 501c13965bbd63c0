//! One-way notification sink for progress and failure notices.

use serde::Serialize;

use crate::types::TaskStatus;

/// Stable notice identifiers; a sink may replace an earlier notice with the
/// same id.
pub mod ids {
    pub const COMPUTE_ADDRESS_ERROR: &str = "compute-address-error";
    pub const DEPOSIT_CHECK: &str = "deposit-check";
    pub const GENERATE_DATA: &str = "generate-data";
    pub const TOGGLE_OPERATOR: &str = "toggle-operator";
    pub const DEPLOY_AUTOMATION: &str = "deploy-automation";
    pub const SETUP_ERROR: &str = "setup-error";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NoticeKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn loading(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, "Setup in Progress", message, NoticeKind::Loading)
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, "Setup Failed", message, NoticeKind::Error)
    }

    /// Notice for an observed task status, id `deployment-<status>`.
    pub fn task_status(status: TaskStatus) -> Self {
        let (message, kind) = match status {
            TaskStatus::Pending => ("Setup in progress...", NoticeKind::Loading),
            TaskStatus::Executing => ("Finalizing setup...", NoticeKind::Loading),
            TaskStatus::Successful => ("Automation is now active", NoticeKind::Success),
            TaskStatus::Failed => ("Setup failed", NoticeKind::Error),
            TaskStatus::Cancelled => ("Setup was cancelled", NoticeKind::Error),
        };
        Self::new(
            format!("deployment-{status}"),
            "Automation Status",
            message,
            kind,
        )
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Error => {
                tracing::warn!(id = %notice.id, title = %notice.title, "{}", notice.message)
            }
            NoticeKind::Success | NoticeKind::Loading => {
                tracing::info!(id = %notice.id, title = %notice.title, "{}", notice.message)
            }
        }
    }
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: Notice) {}
}

//! `DreamReport` and the `Notifier` sink it's published through.
//!
//! **[SUPPLEMENT]** §2 assigns the Dreaming Worker "reporting per tenant",
//! which spec.md's body never details further. Grounded in
//! `original_source/p8fs/src/p8fs/services/slack.py` (fire-and-forget
//! delivery, tenant-scoped message) and the Notifiers collaborator implied
//! by §6: this crate implements the value object and the trait, not real
//! email/Slack delivery.

use crate::types::job::DataWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// One dreaming pass's outcome for a tenant, handed to a [`Notifier`] on
/// completion (success or failure alike).
#[derive(Debug, Clone, Default)]
pub struct DreamReport {
    pub tenant_id: String,
    pub window: Option<DataWindow>,
    pub resources_processed: usize,
    pub entities_extracted: usize,
    pub moments_created: usize,
    pub moments_rejected: usize,
    pub edges_written: usize,
    pub warnings: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl DreamReport {
    pub fn new(tenant_id: impl Into<String>, window: DataWindow) -> Self {
        Self { tenant_id: tenant_id.into(), window: Some(window), ..Default::default() }
    }
}

/// Fire-and-forget sink for a completed [`DreamReport`]. A failure here
/// never fails the dreaming job itself — reporting is best-effort (§6).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &DreamReport);
}

/// In-memory `Notifier` used by tests and as the default when no real
/// delivery channel is configured.
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<DreamReport>>,
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, report: &DreamReport) {
        self.sent.lock().unwrap().push(report.clone());
    }
}

impl InMemoryNotifier {
    pub fn sent(&self) -> Vec<DreamReport> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_notifier_records_reports() {
        let notifier = InMemoryNotifier::default();
        let window = DataWindow { start: Utc::now(), end: Utc::now() };
        let report = DreamReport::new("tenant-a", window);
        notifier.notify(&report).await;
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].tenant_id, "tenant-a");
    }
}

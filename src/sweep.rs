//! Periodic reconciliation sweep.

use std::time::Duration;

use campusdesk_enrollment::StatsReconciler;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Runs [`StatsReconciler::reconcile_all`] every `period`, starting one
/// period after the call.
pub fn spawn_reconciliation_sweep(reconciler: StatsReconciler, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Starting reconciliation sweep");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match reconciler.reconcile_all().await {
                Ok(report) => info!(
                    organizations = report.organizations,
                    drift = report.drift_detected,
                    pruned = report.members_pruned,
                    repaired = report.students_repaired,
                    orphans = report.orphans_removed,
                    "Reconciliation sweep finished"
                ),
                Err(e) => {
                    metrics::counter!("reconciliation_failures_total").increment(1);
                    error!(error = %e, "Reconciliation sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use campusdesk_enrollment::{EnrollmentStore, InMemoryStore};

    #[tokio::test]
    async fn test_sweep_heals_counters_after_one_period() {
        let memory = InMemoryStore::new();
        let org = memory.insert_organization("Harbor", None);
        let class = memory.insert_class(org.id, "JSS1", "Gold");
        memory.insert_section(&class, "A", 10);
        memory.insert_class(org.id, "JSS2", "Gold");

        let store: Arc<dyn EnrollmentStore> = Arc::new(memory.clone());
        let handle = spawn_reconciliation_sweep(
            StatsReconciler::new(Arc::clone(&store)),
            Duration::from_millis(20),
        );

        let mut total_classes = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            total_classes = store
                .get_organization(org.id)
                .await
                .unwrap()
                .unwrap()
                .total_classes;
            if total_classes == 2 {
                break;
            }
        }

        assert_eq!(total_classes, 2);
        handle.abort();
    }
}

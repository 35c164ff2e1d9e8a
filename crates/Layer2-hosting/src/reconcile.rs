//! Boot-time reconciliation - relaunch every application whose last known
//! status was `running`

use crate::command::LaunchCommand;
use crate::supervisor::Supervisor;
use tracing::{error, info, warn};
use unicloud_foundation::{Error, ReconcileConfig, Result};

/// A record that could not be relaunched
#[derive(Debug)]
pub struct ReconcileFailure {
    pub identity: String,
    pub error: Error,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub restarted: Vec<String>,
    pub failed: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    /// Records that were `running` in the registry
    pub fn total(&self) -> usize {
        self.restarted.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Replays the registry into the supervisor
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    /// Flip records whose relaunch failed to `stopped`
    mark_failed_stopped: bool,
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            mark_failed_stopped: config.mark_failed_stopped,
        }
    }

    /// Start every `running` record. Per-record failures are logged and
    /// reported; only a registry that cannot be read fails the pass.
    pub async fn run(&self, supervisor: &Supervisor) -> Result<ReconcileReport> {
        let records = supervisor.registry().load()?;
        let mut report = ReconcileReport::default();

        for (identity, record) in records.into_iter().filter(|(_, r)| r.is_running()) {
            let path = supervisor.workspaces().path_for(&record.workspace_name);
            let started = match LaunchCommand::parse(&record.launch_command) {
                Ok(command) => supervisor.start(&identity, &path, &command).await,
                Err(e) => Err(e),
            };

            match started {
                Ok(()) => {
                    info!(identity = %identity, workspace = %record.workspace_name, "Application restarted");
                    report.restarted.push(identity);
                }
                Err(e) => {
                    error!(identity = %identity, workspace = %record.workspace_name, error = %e, "Failed to restart application");
                    if self.mark_failed_stopped {
                        if let Err(persist) = supervisor.mark_stopped(&identity).await {
                            warn!(identity = %identity, error = %persist, "Failed to mark record stopped");
                        }
                    }
                    report.failed.push(ReconcileFailure { identity, error: e });
                }
            }
        }

        info!(
            restarted = report.restarted.len(),
            failed = report.failed.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = ReconcileReport {
            restarted: vec!["U1".into(), "U2".into()],
            failed: vec![ReconcileFailure {
                identity: "U3".into(),
                error: Error::NotHosted("U3".into()),
            }],
        };
        assert_eq!(report.total(), 3);
        assert!(!report.is_clean());
        assert!(ReconcileReport::default().is_clean());
    }

    #[test]
    fn test_from_config() {
        let reconciler = Reconciler::new(&ReconcileConfig {
            mark_failed_stopped: true,
        });
        assert!(reconciler.mark_failed_stopped);
        assert!(!Reconciler::default().mark_failed_stopped);
    }
}

//! Structured lifecycle events for performance monitors
//!
//! Every event carries an `event` field plus the namespace and claim the
//! monitor belongs to, so JSON log lines can be grouped per monitor.

use tracing::{info, warn};

/// Structured logger for monitor lifecycle events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    namespace: String,
    claim: String,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>, claim: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            claim: claim.into(),
        }
    }

    /// Log the outcome of one provisioning attempt
    pub fn log_provision_attempt(&self, attempt: u32, max_attempts: u32, error: Option<&str>) {
        match error {
            None => {
                info!(
                    event = "provision_attempt",
                    namespace = %self.namespace,
                    claim = %self.claim,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    success = true,
                    "Diagnostic pod created"
                );
            }
            Some(error) => {
                warn!(
                    event = "provision_attempt",
                    namespace = %self.namespace,
                    claim = %self.claim,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    success = false,
                    error = %error,
                    "Diagnostic pod creation failed"
                );
            }
        }
    }

    /// Log entry into degraded mode
    pub fn log_degraded(&self, reason: &str) {
        warn!(
            event = "degraded",
            namespace = %self.namespace,
            claim = %self.claim,
            reason = %reason,
            "Falling back to claim metadata only"
        );
    }

    /// Log monitor startup
    pub fn log_monitor_started(&self, diagnostic_pod: Option<&str>, degraded: bool) {
        info!(
            event = "monitor_started",
            namespace = %self.namespace,
            claim = %self.claim,
            diagnostic_pod = ?diagnostic_pod,
            degraded = degraded,
            "Performance monitor started"
        );
    }

    /// Log diagnostic pod deletion
    pub fn log_pod_deleted(&self, pod: &str, success: bool) {
        if success {
            info!(
                event = "pod_deleted",
                namespace = %self.namespace,
                claim = %self.claim,
                pod = %pod,
                "Diagnostic pod deleted"
            );
        } else {
            warn!(
                event = "pod_delete_failed",
                namespace = %self.namespace,
                claim = %self.claim,
                pod = %pod,
                "Failed to delete diagnostic pod"
            );
        }
    }

    /// Log monitor shutdown
    pub fn log_monitor_stopped(&self, cycles: u64) {
        info!(
            event = "monitor_stopped",
            namespace = %self.namespace,
            claim = %self.claim,
            cycles = cycles,
            "Performance monitor stopped"
        );
    }
}

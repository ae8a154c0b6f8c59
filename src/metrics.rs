use anyhow::Result;
use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::{InteractionFlag, RequestType, SubscriptionTier};

/// Telemetry for the coaching engine.
///
/// Holds metric names; recording goes through the `metrics` facade and is a
/// no-op until a recorder is installed.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    pub coaching_requests_total: &'static str,
    pub model_calls_total: &'static str,
    pub model_call_duration: &'static str,
    pub quota_denials_total: &'static str,
    pub flag_updates_total: &'static str,
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            coaching_requests_total: "forge_coaching_requests_total",
            model_calls_total: "forge_model_calls_total",
            model_call_duration: "forge_model_call_duration_seconds",
            quota_denials_total: "forge_quota_denials_total",
            flag_updates_total: "forge_interaction_flag_updates_total",
            errors_total: "forge_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Initialize metrics collection
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record a completed coaching request and its outcome
    pub fn record_coaching_request(&self, request_type: RequestType, outcome: &'static str) {
        counter!(self.coaching_requests_total, "type" => request_type.as_str(), "outcome" => outcome).increment(1);
    }

    /// Record an external model call
    pub fn record_model_call(&self, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.model_calls_total, "status" => status).increment(1);
        histogram!(self.model_call_duration, "status" => status).record(duration.as_secs_f64());
    }

    /// Record a request refused by the quota policy
    pub fn record_quota_denial(&self, tier: SubscriptionTier) {
        counter!(self.quota_denials_total, "tier" => tier.as_str()).increment(1);
    }

    /// Record a lifecycle flag being set
    pub fn record_flag_update(&self, flag: InteractionFlag) {
        counter!(self.flag_updates_total, "flag" => flag.as_str()).increment(1);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(self.errors_total, "type" => error_type, "operation" => operation).increment(1);
    }
}

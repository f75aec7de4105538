// file: src/utils/telemetry.rs
// description: health reporting for the verify command and stage timing for sync runs
// reference: https://docs.rs/tracing

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn icon(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        }
    }
}

/// Result of checking one part of the sync setup (store, collection, payloads).
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    pub fn healthy(component: &str, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Healthy, None, response_time)
    }

    pub fn degraded(component: &str, message: String, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Degraded, Some(message), response_time)
    }

    pub fn unhealthy(component: &str, message: String, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Unhealthy, Some(message), response_time)
    }

    fn with_status(
        component: &str,
        status: HealthStatus,
        message: Option<String>,
        response_time: Duration,
    ) -> Self {
        Self {
            component: component.to_string(),
            status,
            message,
            response_time_ms: response_time.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub generated_at: DateTime<Utc>,
    pub version: String,
}

impl HealthReport {
    /// Overall status is the worst status among the checks.
    pub fn new(checks: Vec<HealthCheck>, version: impl Into<String>) -> Self {
        let overall_status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            overall_status,
            checks,
            generated_at: Utc::now(),
            version: version.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == HealthStatus::Healthy
    }

    pub fn format(&self) -> String {
        let mut output = format!(
            "{} Store health: {:?}\nVersion: {}\nChecked at: {}\n\n",
            self.overall_status.icon(),
            self.overall_status,
            self.version,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        for check in &self.checks {
            output.push_str(&format!(
                "{} {} ({:?}) - {}ms",
                check.status.icon(),
                check.component,
                check.status,
                check.response_time_ms
            ));

            if let Some(ref msg) = check.message {
                output.push_str(&format!("\n  {}", msg));
            }

            output.push('\n');
        }

        output
    }
}

/// Logs how long one stage of a run took.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "{}: {} items in {:.2}s",
            self.operation,
            count,
            elapsed.as_secs_f64()
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_is_worst() {
        let report = HealthReport::new(
            vec![
                HealthCheck::healthy("store", Duration::from_millis(3)),
                HealthCheck::degraded("payloads", "2 points need repair".into(), Duration::ZERO),
            ],
            "0.1.0",
        );
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        assert!(!report.is_healthy());

        let report = HealthReport::new(
            vec![HealthCheck::unhealthy("collection", "missing".into(), Duration::ZERO)],
            "0.1.0",
        );
        assert_eq!(report.overall_status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_format_lists_checks() {
        let report = HealthReport::new(
            vec![
                HealthCheck::healthy("store", Duration::from_millis(12)),
                HealthCheck::degraded("payloads", "1 point needs repair".into(), Duration::ZERO),
            ],
            "0.1.0",
        );
        let text = report.format();

        assert!(text.contains("✓ store (Healthy) - 12ms"));
        assert!(text.contains("⚠ payloads (Degraded)"));
        assert!(text.contains("\n  1 point needs repair"));
    }

    #[test]
    fn test_timer_measures() {
        let timer = OperationTimer::new("scan");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.finish_with_count(3) >= Duration::from_millis(5));
    }
}

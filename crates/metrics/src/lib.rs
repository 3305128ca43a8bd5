use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe metrics collector for the trading loop.
#[derive(Debug)]
pub struct RunnerMetrics {
    // Counters
    ticks: AtomicU64,
    decisions_allowed: AtomicU64,
    decisions_denied: AtomicU64,
    orders_submitted: AtomicU64,
    orders_failed: AtomicU64,
    submit_attempts: AtomicU64,
    strategy_errors: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_tick_time: Option<Instant>,
    last_order_time: Option<Instant>,
}

impl Default for RunnerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            decisions_allowed: AtomicU64::new(0),
            decisions_denied: AtomicU64::new(0),
            orders_submitted: AtomicU64::new(0),
            orders_failed: AtomicU64::new(0),
            submit_attempts: AtomicU64::new(0),
            strategy_errors: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_tick_time: None,
                last_order_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_tick_time = Some(Instant::now());
    }

    pub fn inc_decisions_allowed(&self) {
        self.decisions_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decisions_denied(&self) {
        self.decisions_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_order_time = Some(Instant::now());
    }

    pub fn inc_orders_failed(&self) {
        self.orders_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_submit_attempts(&self, attempts: u64) {
        self.submit_attempts.fetch_add(attempts, Ordering::Relaxed);
    }

    pub fn inc_strategy_errors(&self) {
        self.strategy_errors.fetch_add(1, Ordering::Relaxed);
    }

    // --- Getter methods ---

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn decisions_allowed(&self) -> u64 {
        self.decisions_allowed.load(Ordering::Relaxed)
    }

    pub fn decisions_denied(&self) -> u64 {
        self.decisions_denied.load(Ordering::Relaxed)
    }

    pub fn orders_submitted(&self) -> u64 {
        self.orders_submitted.load(Ordering::Relaxed)
    }

    pub fn orders_failed(&self) -> u64 {
        self.orders_failed.load(Ordering::Relaxed)
    }

    pub fn submit_attempts(&self) -> u64 {
        self.submit_attempts.load(Ordering::Relaxed)
    }

    pub fn strategy_errors(&self) -> u64 {
        self.strategy_errors.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_tick(&self) -> Option<f64> {
        self.inner
            .read()
            .last_tick_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_order(&self) -> Option<f64> {
        self.inner
            .read()
            .last_order_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks(),
            decisions_allowed: self.decisions_allowed(),
            decisions_denied: self.decisions_denied(),
            orders_submitted: self.orders_submitted(),
            orders_failed: self.orders_failed(),
            submit_attempts: self.submit_attempts(),
            strategy_errors: self.strategy_errors(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_tick: self.secs_since_last_tick(),
            secs_since_last_order: self.secs_since_last_order(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub decisions_allowed: u64,
    pub decisions_denied: u64,
    pub orders_submitted: u64,
    pub orders_failed: u64,
    pub submit_attempts: u64,
    pub strategy_errors: u64,
    pub uptime_secs: f64,
    pub secs_since_last_tick: Option<f64>,
    pub secs_since_last_order: Option<f64>,
}

/// Health status of the trading loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Loop is ticking and orders go through.
    Healthy,
    /// Loop is ticking slowly or most orders fail.
    Degraded,
    /// Loop has stopped ticking.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Seconds without a tick before the loop counts as degraded.
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    /// Seconds without a tick before the loop counts as unhealthy.
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    /// Fraction of finished orders that failed. 0 when nothing was sent.
    pub fn order_failure_rate(&self) -> f64 {
        let finished = self.orders_submitted + self.orders_failed;
        if finished == 0 {
            0.0
        } else {
            self.orders_failed as f64 / finished as f64
        }
    }

    /// Determine the health status based on metrics.
    pub fn health_status(&self) -> HealthStatus {
        let idle_secs = self.secs_since_last_tick.unwrap_or(self.uptime_secs);

        if idle_secs > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if idle_secs > Self::STALE_THRESHOLD_SECS || self.order_failure_rate() > 0.5 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Trading Loop Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Ticks:               {}", self.ticks)?;
        writeln!(f, "Decisions allowed:   {}", self.decisions_allowed)?;
        writeln!(f, "Decisions denied:    {}", self.decisions_denied)?;
        writeln!(f, "Orders submitted:    {}", self.orders_submitted)?;
        writeln!(f, "Orders failed:       {}", self.orders_failed)?;
        writeln!(f, "Submit attempts:     {}", self.submit_attempts)?;
        writeln!(f, "Strategy errors:     {}", self.strategy_errors)?;
        if let Some(secs) = self.secs_since_last_tick {
            writeln!(f, "Since last tick:     {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_order {
            writeln!(f, "Since last order:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<RunnerMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(RunnerMetrics::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = RunnerMetrics::new();

        metrics.inc_ticks();
        metrics.inc_ticks();
        metrics.inc_decisions_denied();
        metrics.add_submit_attempts(3);

        assert_eq!(metrics.ticks(), 2);
        assert_eq!(metrics.decisions_denied(), 1);
        assert_eq!(metrics.submit_attempts(), 3);
    }

    #[test]
    fn test_last_tick_time() {
        let metrics = RunnerMetrics::new();
        assert!(metrics.secs_since_last_tick().is_none());

        metrics.inc_ticks();
        assert!(metrics.secs_since_last_tick().unwrap() < 1.0);
    }

    #[test]
    fn test_healthy_startup() {
        let snapshot = MetricsSnapshot {
            uptime_secs: 5.0,
            ..Default::default()
        };
        assert_eq!(snapshot.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_degraded_when_orders_mostly_fail() {
        let snapshot = MetricsSnapshot {
            orders_submitted: 1,
            orders_failed: 3,
            uptime_secs: 100.0,
            secs_since_last_tick: Some(1.0),
            ..Default::default()
        };
        assert_eq!(snapshot.order_failure_rate(), 0.75);
        assert_eq!(snapshot.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_degraded_stale_ticks() {
        let snapshot = MetricsSnapshot {
            ticks: 10,
            uptime_secs: 120.0,
            secs_since_last_tick: Some(45.0),
            ..Default::default()
        };
        assert_eq!(snapshot.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_unhealthy_no_ticks_long_uptime() {
        let snapshot = MetricsSnapshot {
            uptime_secs: 120.0,
            ..Default::default()
        };
        assert_eq!(snapshot.health_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_display_contains_counters() {
        let metrics = RunnerMetrics::new();
        metrics.inc_orders_submitted();
        let text = metrics.snapshot().to_string();
        assert!(text.contains("Orders submitted:    1"));
    }
}

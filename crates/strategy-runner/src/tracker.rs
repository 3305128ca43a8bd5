//! Per-strategy realized performance.
//!
//! The router reads `score` and `sharpe` from here every tick, so reads are
//! lock-sharded and never block on updates to other strategies.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::drawdown::drawdown;

/// Default window for rolling drawdown.
pub const DEFAULT_DRAWDOWN_WINDOW: usize = 10;

/// Realized PnL record for one strategy.
///
/// Append-only. `wins + losses == pnl.len()` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyStats {
    /// Realized PnL per closed trade, oldest first.
    pub pnl: Vec<Decimal>,
    /// Trades with PnL > 0.
    pub wins: u32,
    /// Trades with PnL <= 0.
    pub losses: u32,
}

impl StrategyStats {
    fn record(&mut self, pnl: Decimal) {
        self.pnl.push(pnl);
        if pnl > Decimal::ZERO {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }

    pub fn trades(&self) -> usize {
        self.pnl.len()
    }

    pub fn pnl_total(&self) -> Decimal {
        self.pnl.iter().copied().sum()
    }

    pub fn winrate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(total)
        }
    }

    /// Mean over population standard deviation.
    ///
    /// A single trade counts its deviation as 1. Several identical PnLs
    /// have no spread and give 0.
    pub fn sharpe(&self) -> f64 {
        if self.pnl.is_empty() {
            return 0.0;
        }

        let values: Vec<f64> = self.pnl.iter().map(|p| p.to_f64().unwrap_or(0.0)).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        if values.len() == 1 {
            return mean;
        }

        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        if std > 0.0 {
            mean / std
        } else {
            0.0
        }
    }

    pub fn rolling_drawdown(&self, window: usize) -> f64 {
        drawdown(&self.pnl, window).to_f64().unwrap_or(0.0)
    }

    /// `pnl_total * winrate - rolling_drawdown`.
    pub fn score(&self) -> f64 {
        let pnl = self.pnl_total().to_f64().unwrap_or(0.0);
        pnl * self.winrate() - self.rolling_drawdown(DEFAULT_DRAWDOWN_WINDOW)
    }
}

/// Summary row for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyMetrics {
    pub name: String,
    pub trades: usize,
    pub pnl_total: Decimal,
    pub winrate: f64,
    pub sharpe: f64,
    pub drawdown: f64,
    pub score: f64,
}

/// Thread-safe performance tracker keyed by strategy name.
#[derive(Debug, Default)]
pub struct StrategyPerformanceTracker {
    stats: DashMap<String, StrategyStats>,
    /// Names in first-seen order, for deterministic tie-breaking.
    order: RwLock<Vec<String>>,
}

impl StrategyPerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one realized trade for a strategy.
    pub fn update(&self, strategy: &str, pnl: Decimal) {
        let mut entry = self.stats.entry(strategy.to_string()).or_insert_with(|| {
            self.order.write().push(strategy.to_string());
            StrategyStats::default()
        });
        entry.record(pnl);

        debug!(
            strategy = %strategy,
            pnl = %pnl,
            trades = entry.trades(),
            wins = entry.wins,
            "strategy performance updated"
        );
    }

    fn read<T>(&self, strategy: &str, default: T, f: impl FnOnce(&StrategyStats) -> T) -> T {
        self.stats.get(strategy).map(|s| f(s.value())).unwrap_or(default)
    }

    /// Sum of realized PnL, 0 for an unknown strategy.
    pub fn pnl_total(&self, strategy: &str) -> Decimal {
        self.read(strategy, Decimal::ZERO, StrategyStats::pnl_total)
    }

    /// Fraction of winning trades in [0, 1], 0 with no trades.
    pub fn winrate(&self, strategy: &str) -> f64 {
        self.read(strategy, 0.0, StrategyStats::winrate)
    }

    pub fn sharpe(&self, strategy: &str) -> f64 {
        self.read(strategy, 0.0, StrategyStats::sharpe)
    }

    /// Drawdown of the last `window` PnL values. Always >= 0.
    pub fn rolling_drawdown(&self, strategy: &str, window: usize) -> f64 {
        self.read(strategy, 0.0, |s| s.rolling_drawdown(window))
    }

    /// Composite ranking score, higher is better.
    pub fn score(&self, strategy: &str) -> f64 {
        self.read(strategy, 0.0, StrategyStats::score)
    }

    /// Strategy with the highest score, ties going to the first seen.
    pub fn best(&self) -> Option<String> {
        let names = self.strategies();
        let mut best: Option<(String, f64)> = None;

        for name in names {
            let score = self.score(&name);
            match &best {
                Some((_, top)) if score <= *top => {}
                _ => best = Some((name, score)),
            }
        }

        best.map(|(name, _)| name)
    }

    pub fn stats(&self, strategy: &str) -> Option<StrategyStats> {
        self.stats.get(strategy).map(|s| s.clone())
    }

    /// Known strategy names in first-seen order.
    pub fn strategies(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Metrics for every known strategy in first-seen order.
    pub fn all_stats(&self) -> Vec<StrategyMetrics> {
        self.strategies()
            .into_iter()
            .filter_map(|name| {
                let stats = self.stats(&name)?;
                Some(StrategyMetrics {
                    trades: stats.trades(),
                    pnl_total: stats.pnl_total(),
                    winrate: stats.winrate(),
                    sharpe: stats.sharpe(),
                    drawdown: stats.rolling_drawdown(DEFAULT_DRAWDOWN_WINDOW),
                    score: stats.score(),
                    name,
                })
            })
            .collect()
    }
}

/// Shared tracker type.
pub type SharedTracker = Arc<StrategyPerformanceTracker>;

/// Create a new shared tracker.
pub fn create_tracker() -> SharedTracker {
    Arc::new(StrategyPerformanceTracker::new())
}

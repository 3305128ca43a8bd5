//! Regime-aware strategy allocation.
//!
//! Each `route` call classifies the snapshot into a [`Regime`], splits
//! weight across the registered strategies, and asks every strategy with a
//! nonzero weight for a signal. Classification and allocation are
//! recomputed from scratch every call; only the tick counter and the
//! hysteresis-guarded active strategy carry over.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use model::{MarketSnapshot, Signal};
use strategy_core::SharedStrategy;

use crate::tracker::SharedTracker;

/// Coarse market classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Trend,
    Sideways,
    Sentiment,
    Mixed,
}

impl Regime {
    /// Hand-tuned split for the regime, by canonical strategy name.
    ///
    /// `Mixed` has no fixed split; it is weighted by performance.
    pub fn fixed_split(&self) -> &'static [(&'static str, f64)] {
        match self {
            Regime::Trend => &[
                ("TrendFollowing", 0.6),
                ("Momentum", 0.3),
                ("MeanReversion", 0.1),
            ],
            Regime::Sideways => &[
                ("GridTrading", 0.5),
                ("MeanReversion", 0.4),
                ("MarketMaking", 0.1),
            ],
            Regime::Sentiment => &[
                ("Sentiment", 0.7),
                ("Breakout", 0.2),
                ("Arbitrage", 0.1),
            ],
            Regime::Mixed => &[],
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Trend => write!(f, "trend"),
            Regime::Sideways => write!(f, "sideways"),
            Regime::Sentiment => write!(f, "sentiment"),
            Regime::Mixed => write!(f, "mixed"),
        }
    }
}

/// Thresholds for regime detection.
#[derive(Debug, Clone)]
pub struct RegimeThresholds {
    /// |trend| above this (with high volatility) is a trend.
    pub trend_strength: f64,
    /// Volatility above this (with strong trend) is a trend.
    pub trend_volatility: f64,
    /// Volatility below this is sideways.
    pub sideways_volatility: f64,
    /// |sentiment| above this is sentiment-driven.
    pub sentiment: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            trend_strength: 0.7,
            trend_volatility: 0.5,
            sideways_volatility: 0.2,
            sentiment: 0.7,
        }
    }
}

/// Configuration for the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub thresholds: RegimeThresholds,
    /// Maximum number of strategies that receive weight.
    pub max_strategies: usize,
    /// Ticks that must pass before the active strategy may change again.
    pub cooldown_ticks: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            thresholds: RegimeThresholds::default(),
            max_strategies: 5,
            cooldown_ticks: 5,
        }
    }
}

impl RouterConfig {
    /// Builder method to set regime thresholds.
    pub fn with_thresholds(mut self, thresholds: RegimeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Builder method to set the hysteresis cooldown.
    pub fn with_cooldown_ticks(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }
}

/// Weights per strategy, highest first, summing to 1 when not empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Allocation {
    weights: Vec<(String, f64)>,
}

impl Allocation {
    /// Weight for a strategy, 0 if absent.
    pub fn get(&self, strategy: &str) -> f64 {
        self.weights
            .iter()
            .find(|(name, _)| name == strategy)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(name, w)| (name.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }
}

/// One strategy's contribution for a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleSignal {
    pub strategy: String,
    pub allocation: f64,
    /// `None` when the strategy failed.
    pub signal: Option<Signal>,
    pub error: Option<String>,
}

/// Introspection view of the router.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub strategies: Vec<String>,
    pub regime: Option<Regime>,
    pub last_allocation: Allocation,
    pub active_strategy: Option<String>,
    pub tick_count: u64,
}

#[derive(Debug, Default)]
struct RouterState {
    tick_count: u64,
    last_switch_tick: Option<u64>,
    active_strategy: Option<String>,
    regime: Option<Regime>,
    last_allocation: Allocation,
}

/// Routes each tick to a weighted ensemble of strategies.
pub struct DynamicStrategyRouter {
    strategies: Vec<SharedStrategy>,
    tracker: SharedTracker,
    config: RouterConfig,
    state: Mutex<RouterState>,
}

impl DynamicStrategyRouter {
    /// Create a router over an explicit strategy list.
    ///
    /// Registration order breaks ties between equal weights.
    pub fn new(strategies: Vec<SharedStrategy>, tracker: SharedTracker) -> Self {
        Self {
            strategies,
            tracker,
            config: RouterConfig::default(),
            state: Mutex::new(RouterState::default()),
        }
    }

    /// Builder method to set configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Classify the snapshot. Checks run in priority order: trend first.
    pub fn detect_regime(&self, snapshot: &MarketSnapshot) -> Regime {
        let t = &self.config.thresholds;
        let trend = finite_or_zero(snapshot.trend);
        let volatility = finite_or_zero(snapshot.volatility);
        let sentiment = finite_or_zero(snapshot.sentiment);

        if trend.abs() > t.trend_strength && volatility > t.trend_volatility {
            Regime::Trend
        } else if volatility < t.sideways_volatility {
            Regime::Sideways
        } else if sentiment.abs() > t.sentiment {
            Regime::Sentiment
        } else {
            Regime::Mixed
        }
    }

    /// Split weight across registered strategies for the regime.
    ///
    /// Keeps the `max_strategies` heaviest and renormalizes them to 1.
    /// Returns an empty allocation when no strategy has positive weight.
    pub fn compute_allocations(&self, regime: Regime) -> Allocation {
        let mut weights: Vec<(String, f64)> = self
            .strategies
            .iter()
            .map(|s| {
                let name = s.name();
                let weight = match regime {
                    Regime::Mixed => self.tracker.sharpe(name).abs(),
                    _ => regime
                        .fixed_split()
                        .iter()
                        .find(|(canonical, _)| *canonical == name)
                        .map(|(_, w)| *w)
                        .unwrap_or(0.0),
                };
                (name.to_string(), finite_or_zero(weight))
            })
            .filter(|(_, w)| *w > 0.0)
            .collect();

        // Stable: equal weights keep registration order.
        weights.sort_by(|a, b| b.1.total_cmp(&a.1));
        weights.truncate(self.config.max_strategies);

        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Allocation::default();
        }
        for (_, w) in &mut weights {
            *w /= total;
        }

        Allocation { weights }
    }

    /// Run the ensemble for one tick.
    ///
    /// Only strategies with a nonzero weight are asked to analyze. A
    /// failing strategy is recorded with its error and never stops the
    /// others. Entries follow registration order.
    pub fn route(&self, snapshot: &MarketSnapshot) -> Vec<EnsembleSignal> {
        let regime = self.detect_regime(snapshot);
        let allocation = self.compute_allocations(regime);

        debug!(
            symbol = %snapshot.symbol,
            regime = %regime,
            strategies = allocation.len(),
            "allocation computed"
        );

        let mut entries = Vec::with_capacity(allocation.len());
        for strategy in &self.strategies {
            let name = strategy.name();
            let weight = allocation.get(name);
            if weight <= 0.0 {
                continue;
            }

            let entry = match strategy.analyze(snapshot) {
                Ok(signal) => EnsembleSignal {
                    strategy: name.to_string(),
                    allocation: weight,
                    signal: Some(signal),
                    error: None,
                },
                Err(e) => {
                    warn!(
                        symbol = %snapshot.symbol,
                        strategy = %name,
                        error = %e,
                        "strategy analysis failed"
                    );
                    EnsembleSignal {
                        strategy: name.to_string(),
                        allocation: weight,
                        signal: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            entries.push(entry);
        }

        self.advance(regime, allocation);
        entries
    }

    /// Record the tick and move the active strategy if the cooldown allows.
    fn advance(&self, regime: Regime, allocation: Allocation) {
        let best = self.best_registered();
        let mut state = self.state.lock();

        state.tick_count += 1;
        state.regime = Some(regime);
        state.last_allocation = allocation;

        let Some(best) = best else {
            return;
        };
        if state.active_strategy.as_deref() == Some(best.as_str()) {
            return;
        }

        let cooled_down = state
            .last_switch_tick
            .map(|last| state.tick_count - last >= self.config.cooldown_ticks)
            .unwrap_or(true);

        if cooled_down {
            info!(
                from = ?state.active_strategy,
                to = %best,
                tick = state.tick_count,
                "active strategy switched"
            );
            state.active_strategy = Some(best);
            state.last_switch_tick = Some(state.tick_count);
        } else {
            debug!(candidate = %best, tick = state.tick_count, "strategy switch held by cooldown");
        }
    }

    /// Highest tracker score among this router's strategies. Strategies
    /// without trades are skipped; ties keep registration order.
    fn best_registered(&self) -> Option<String> {
        let mut best: Option<(&str, f64)> = None;
        for strategy in &self.strategies {
            let name = strategy.name();
            let Some(stats) = self.tracker.stats(name) else {
                continue;
            };
            let score = stats.score();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name.to_string())
    }

    /// Strategy currently favored by the hysteresis filter.
    pub fn active_strategy(&self) -> Option<String> {
        self.state.lock().active_strategy.clone()
    }

    pub fn status(&self) -> RouterStatus {
        let state = self.state.lock();
        RouterStatus {
            strategies: self.strategies.iter().map(|s| s.name().to_string()).collect(),
            regime: state.regime,
            last_allocation: state.last_allocation.clone(),
            active_strategy: state.active_strategy.clone(),
            tick_count: state.tick_count,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

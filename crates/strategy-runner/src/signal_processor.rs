//! Picks the signal that acts for a tick out of the ensemble.

use model::Signal;
use serde::Serialize;
use tracing::debug;

use crate::router::EnsembleSignal;

/// The ensemble entry chosen to act.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedSignal {
    pub strategy: String,
    pub allocation: f64,
    pub signal: Signal,
}

/// Highest-allocation entry that produced a signal.
///
/// Failed entries are skipped. Equal allocations keep ensemble order. A
/// selected `Hold` is returned as is; the caller decides it means no trade.
pub fn select_signal(entries: &[EnsembleSignal]) -> Option<SelectedSignal> {
    let mut best: Option<(&EnsembleSignal, Signal)> = None;

    for entry in entries {
        let Some(signal) = entry.signal else {
            continue;
        };
        match best {
            Some((top, _)) if entry.allocation <= top.allocation => {}
            _ => best = Some((entry, signal)),
        }
    }

    let (entry, signal) = best?;
    debug!(
        strategy = %entry.strategy,
        allocation = entry.allocation,
        signal = %signal,
        "signal selected"
    );

    Some(SelectedSignal {
        strategy: entry.strategy.clone(),
        allocation: entry.allocation,
        signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(strategy: &str, allocation: f64, signal: Option<Signal>) -> EnsembleSignal {
        EnsembleSignal {
            strategy: strategy.to_string(),
            allocation,
            signal,
            error: signal.is_none().then(|| "failed".to_string()),
        }
    }

    #[test]
    fn test_empty_ensemble() {
        assert!(select_signal(&[]).is_none());
    }

    #[test]
    fn test_highest_allocation_wins() {
        let entries = [
            entry("A", 0.2, Some(Signal::Sell)),
            entry("B", 0.5, Some(Signal::Buy)),
            entry("C", 0.3, Some(Signal::Close)),
        ];

        let selected = select_signal(&entries).unwrap();
        assert_eq!(selected.strategy, "B");
        assert_eq!(selected.signal, Signal::Buy);
    }

    #[test]
    fn test_failed_entries_skipped() {
        let entries = [entry("A", 0.7, None), entry("B", 0.3, Some(Signal::Sell))];

        let selected = select_signal(&entries).unwrap();
        assert_eq!(selected.strategy, "B");

        assert!(select_signal(&[entry("A", 1.0, None)]).is_none());
    }

    #[test]
    fn test_tie_keeps_first() {
        let entries = [
            entry("A", 0.5, Some(Signal::Hold)),
            entry("B", 0.5, Some(Signal::Buy)),
        ];

        let selected = select_signal(&entries).unwrap();
        assert_eq!(selected.strategy, "A");
        assert_eq!(selected.signal, Signal::Hold);
    }
}

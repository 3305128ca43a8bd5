//! Peak-to-trough drawdown over a trailing window.

use rust_decimal::Decimal;

/// Drawdown of the last `window` values as a fraction of the window peak.
///
/// Uses every value when fewer than `window` exist. Returns 0 for an empty
/// series or a non-positive peak, so the result is never negative.
pub fn drawdown(values: &[Decimal], window: usize) -> Decimal {
    let start = values.len().saturating_sub(window);
    let recent = &values[start..];

    let (Some(peak), Some(trough)) = (recent.iter().max(), recent.iter().min()) else {
        return Decimal::ZERO;
    };

    if *peak <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    (*peak - *trough) / *peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_basic_drawdown() {
        assert_eq!(drawdown(&[dec!(1000), dec!(950), dec!(900)], 10), dec!(0.1));
        assert_eq!(drawdown(&[dec!(1000), dec!(990), dec!(980)], 10), dec!(0.02));
    }

    #[test]
    fn test_window_limits_history() {
        let values = [dec!(2000), dec!(100), dec!(100), dec!(90)];
        assert_eq!(drawdown(&values, 3), dec!(0.1));
        assert_eq!(drawdown(&values, 4), dec!(0.955));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(drawdown(&[], 10), Decimal::ZERO);
        assert_eq!(drawdown(&[dec!(0), dec!(0)], 10), Decimal::ZERO);
        assert_eq!(drawdown(&[dec!(-5), dec!(-10)], 10), Decimal::ZERO);
        assert_eq!(drawdown(&[dec!(5)], 0), Decimal::ZERO);
    }

    #[test]
    fn test_never_negative() {
        let values = [dec!(3), dec!(-7), dec!(1), dec!(-2)];
        assert!(drawdown(&values, 10) >= Decimal::ZERO);
    }
}

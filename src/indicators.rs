//! Technical indicators
//!
//! Column computations behind the classification engine. Every function
//! returns one slot per input value; slots before an indicator's warm-up
//! completes are `None`, never zero.
//!
//! Available indicators:
//! - Trend: SMA (trend baseline)
//! - Momentum: RSI-style oscillator with simple, Wilder or exponential smoothing
//! - Volatility: rolling standard deviation of percentage returns

use itertools::Itertools;
use statrs::statistics::Statistics;
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

use crate::config::Smoothing;

/// Upper bound of the oscillator
pub const OSCILLATOR_MAX: f64 = 100.0;

// =============================================================================
// Trend
// =============================================================================

/// Mean of a window measured from its first element.
///
/// Summing deviations instead of raw values keeps a constant window exactly
/// equal to that constant, so a flat price never dips below its own baseline.
fn anchored_mean(window: &[f64]) -> f64 {
    let anchor = window[0];
    let offset: f64 = window.iter().map(|&v| v - anchor).sum();
    anchor + offset / window.len() as f64
}

/// Calculate Simple Moving Average over the trailing `period` values
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                Some(anchored_mean(&values[i + 1 - period..=i]))
            }
        })
        .collect()
}

// =============================================================================
// Momentum
// =============================================================================

/// Split close-to-close changes into gains and loss magnitudes.
///
/// Both vectors have one slot per input value; slot 0 has no predecessor and
/// holds 0.0.
pub fn gains_and_losses(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());

    if values.is_empty() {
        return (gains, losses);
    }

    gains.push(0.0);
    losses.push(0.0);

    for (prev, curr) in values.iter().tuple_windows() {
        let change = curr - prev;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    (gains, losses)
}

/// Average the per-step moves over `period` deltas.
///
/// `moves[0]` is the placeholder for the first observation and is never
/// averaged, so the first defined slot is index `period`.
pub fn average_moves(moves: &[f64], period: usize, smoothing: Smoothing) -> Vec<Option<f64>> {
    let n = moves.len();
    if period == 0 || n <= period {
        return vec![None; n];
    }

    let mut result = vec![None; period];
    result.reserve(n - period);

    match smoothing {
        Smoothing::Simple => {
            for i in period..n {
                result.push(Some(anchored_mean(&moves[i + 1 - period..=i])));
            }
        }
        Smoothing::Wilder => {
            let mut smoothed = anchored_mean(&moves[1..=period]);
            result.push(Some(smoothed));
            for &value in &moves[period + 1..] {
                smoothed = (smoothed * (period - 1) as f64 + value) / period as f64;
                result.push(Some(smoothed));
            }
        }
        Smoothing::Exponential => {
            let mut indicator = match ExponentialMovingAverage::new(period) {
                Ok(i) => i,
                Err(_) => return vec![None; n],
            };
            for (i, &value) in moves.iter().enumerate().skip(1) {
                let ema_val = indicator.next(value);
                if i >= period {
                    result.push(Some(ema_val));
                }
            }
        }
    }

    result
}

/// Convert average gain and loss into a 0-100 oscillator reading.
///
/// Zero average loss pins the reading to 100 (checked first, so a flat
/// window also reads 100); otherwise zero average gain pins it to 0.
pub fn oscillator_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        OSCILLATOR_MAX
    } else if avg_gain == 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        OSCILLATOR_MAX - (OSCILLATOR_MAX / (1.0 + rs))
    }
}

/// Calculate RSI (Relative Strength Index) with the chosen smoothing
pub fn rsi(values: &[f64], period: usize, smoothing: Smoothing) -> Vec<Option<f64>> {
    let (gains, losses) = gains_and_losses(values);
    let avg_gains = average_moves(&gains, period, smoothing);
    let avg_losses = average_moves(&losses, period, smoothing);

    avg_gains
        .iter()
        .zip(avg_losses.iter())
        .map(|(gain, loss)| match (gain, loss) {
            (Some(g), Some(l)) => Some(oscillator_value(*g, *l)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Volatility
// =============================================================================

/// Percentage change from the previous value (slot 0 is `None`)
pub fn pct_returns(values: &[f64]) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![];
    }

    std::iter::once(None)
        .chain(
            values
                .iter()
                .tuple_windows()
                .map(|(prev, curr)| Some((curr - prev) / prev)),
        )
        .collect()
}

/// Rolling sample standard deviation of percentage returns, in percent
pub fn rolling_volatility(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if window < 2 {
        return vec![None; n];
    }

    let returns: Vec<f64> = pct_returns(values).into_iter().flatten().collect();

    // returns[j] is the change into values[j + 1]
    (0..n)
        .map(|i| {
            if i < window {
                None
            } else {
                let slice = &returns[i - window..i];
                Some(slice.iter().std_dev() * 100.0)
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_sma_constant_is_exact() {
        let values = vec![0.1; 60];
        let result = sma(&values, 50);

        assert!(result[48].is_none());
        for value in result.iter().skip(49) {
            assert_eq!(*value, Some(0.1));
        }
    }

    #[test]
    fn test_gains_and_losses() {
        let (gains, losses) = gains_and_losses(&[10.0, 12.0, 11.0, 11.0]);
        assert_eq!(gains, vec![0.0, 2.0, 0.0, 0.0]);
        assert_eq!(losses, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_rsi_simple() {
        let values = vec![1.0, 2.0, 3.0, 2.0, 3.0];
        let result = rsi(&values, 2, Smoothing::Simple);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(100.0));
        assert_relative_eq!(result[3].unwrap(), 50.0);
        assert_relative_eq!(result[4].unwrap(), 50.0);
    }

    #[test]
    fn test_rsi_wilder() {
        let values = vec![1.0, 2.0, 3.0, 2.0, 3.0];
        let result = rsi(&values, 2, Smoothing::Wilder);

        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(100.0));
        assert_relative_eq!(result[3].unwrap(), 50.0);
        // gain (0.5 + 1) / 2 = 0.75, loss (0.5 + 0) / 2 = 0.25
        assert_relative_eq!(result[4].unwrap(), 75.0);
    }

    #[test]
    fn test_rsi_exponential_bounds() {
        let values = vec![
            44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.0, 43.5, 44.0, 44.5, 45.0, 45.25, 45.5, 45.0,
            44.75,
        ];
        let result = rsi(&values, 5, Smoothing::Exponential);

        assert!(result[4].is_none());
        for value in result.iter().skip(5) {
            let v = value.unwrap();
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_rsi_pinning() {
        let rising: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let falling: Vec<f64> = rising.iter().rev().copied().collect();

        for smoothing in [Smoothing::Simple, Smoothing::Wilder, Smoothing::Exponential] {
            assert_eq!(rsi(&rising, 14, smoothing).last().unwrap(), &Some(100.0));
            assert_eq!(rsi(&falling, 14, smoothing).last().unwrap(), &Some(0.0));
        }
    }

    #[test]
    fn test_oscillator_value() {
        assert_eq!(oscillator_value(0.0, 0.0), 100.0);
        assert_eq!(oscillator_value(1.0, 0.0), 100.0);
        assert_eq!(oscillator_value(0.0, 1.0), 0.0);
        assert_relative_eq!(oscillator_value(1.0, 1.0), 50.0);
        assert_relative_eq!(oscillator_value(3.0, 1.0), 75.0);
    }

    #[test]
    fn test_rsi_short_input() {
        assert_eq!(rsi(&[1.0, 2.0], 14, Smoothing::Simple), vec![None, None]);
        assert!(rsi(&[], 14, Smoothing::Simple).is_empty());
    }

    #[test]
    fn test_pct_returns() {
        let result = pct_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(result[0], None);
        assert_relative_eq!(result[1].unwrap(), 0.1);
        assert_relative_eq!(result[2].unwrap(), -0.1);
    }

    #[test]
    fn test_rolling_volatility() {
        let flat = rolling_volatility(&[50.0; 10], 3);
        assert_eq!(flat[2], None);
        assert_eq!(flat[3], Some(0.0));

        // Returns +10% and -10% alternate; sample std of [0.1, -0.1] is sqrt(0.02)
        let result = rolling_volatility(&[100.0, 110.0, 99.0], 2);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 0.02_f64.sqrt() * 100.0, epsilon = 1e-9);
    }
}

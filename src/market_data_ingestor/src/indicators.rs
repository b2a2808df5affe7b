//! Technical indicators derived from a daily series.
//!
//! [`compute`] annotates a contiguous, date-ascending series of one ticker with six
//! indicators:
//! - simple moving averages of `close` over the trailing 200, 50, 20 and 9 bars,
//! - a 14-bar RSI built from simple (not Wilder-smoothed) average gains and losses,
//! - an expanding VWAP over the typical price, anchored at the first bar supplied.
//!
//! Only the supplied series counts as history: a bar needs `N - 1` predecessors
//! *in the slice* before an N-bar indicator is defined, and the VWAP restarts at
//! the first bar of every slice. Callers that re-fetch a ticker from a different
//! start date therefore get different VWAP values for the same dates.
//!
//! Undefined values are `None`, never `NaN`.

use serde::{Deserialize, Serialize};

use crate::models::bar::DailyBar;

/// Windows of the moving averages, in bars, in [`IndicatorVector`] field order.
pub const MA_WINDOWS: [usize; 4] = [200, 50, 20, 9];

/// Look-back of the RSI, in bars.
pub const RSI_PERIOD: usize = 14;

/// The six derived indicators of one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorVector {
    pub ma_200: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_20: Option<f64>,
    pub ma_9: Option<f64>,
    pub rsi: Option<f64>,
    pub vwap: Option<f64>,
}

impl IndicatorVector {
    /// Number of indicators in a vector.
    pub const LEN: usize = 6;

    /// Column names, aligned with [`IndicatorVector::values`].
    pub const NAMES: [&'static str; Self::LEN] = ["ma_200", "ma_50", "ma_20", "ma_9", "rsi", "vwap"];

    /// The indicators as a fixed array, aligned with [`IndicatorVector::NAMES`].
    pub fn values(&self) -> [Option<f64>; Self::LEN] {
        [
            self.ma_200,
            self.ma_50,
            self.ma_20,
            self.ma_9,
            self.rsi,
            self.vwap,
        ]
    }

    /// Whether no indicator is defined (e.g. a one-bar series with zero volume).
    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }
}

/// A daily bar together with the indicators computed for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBar {
    pub bar: DailyBar,
    pub indicators: IndicatorVector,
}

/// Annotates a date-ascending daily series with its indicators.
///
/// The output has the same length and order as the input.
pub fn compute(series: &[DailyBar]) -> Vec<IndicatorBar> {
    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();

    let [ma_200, ma_50, ma_20, ma_9] = MA_WINDOWS.map(|window| sma(&closes, window));
    let rsi = rsi(&closes, RSI_PERIOD);
    let vwap = vwap(series);

    series
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorBar {
            bar: *bar,
            indicators: IndicatorVector {
                ma_200: ma_200[i],
                ma_50: ma_50[i],
                ma_20: ma_20[i],
                ma_9: ma_9[i],
                rsi: rsi[i],
                vwap: vwap[i],
            },
        })
        .collect()
}

/// Simple moving average over the trailing `window` values.
///
/// Position `i` is defined iff `i >= window - 1`. Each window is summed afresh so
/// long series do not accumulate rounding drift.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }
    for (slot, chunk) in out[window - 1..].iter_mut().zip(values.windows(window)) {
        *slot = finite(chunk.iter().sum::<f64>() / window as f64);
    }
    out
}

/// Relative strength index with simple trailing averages.
///
/// The first bar has no predecessor and contributes neither gain nor loss, so the
/// value at `i` is defined iff `i >= period - 1`, like the moving averages.
///
/// When the trailing window has no losses the ratio `avg_gain / avg_loss` is
/// unbounded: a window with gains yields `100.0` (the limit of the formula), a
/// perfectly flat window yields `None` since `0 / 0` has no value.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for (i, close) in closes.iter().enumerate() {
        let delta = if i == 0 { 0.0 } else { close - closes[i - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = sma(&gains, period);
    let avg_loss = sma(&losses, period);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) => rsi_from_averages(gain, loss),
            _ => None,
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }
    let rs = avg_gain / avg_loss;
    finite(100.0 - 100.0 / (1.0 + rs))
}

/// Expanding volume-weighted average of the typical price.
///
/// `vwap[i] = sum(tp * volume) / sum(volume)` over bars `0..=i`; undefined while
/// the cumulative volume is still zero.
pub fn vwap(series: &[DailyBar]) -> Vec<Option<f64>> {
    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;
    series
        .iter()
        .map(|bar| {
            cum_pv += bar.typical_price() * bar.volume;
            cum_volume += bar.volume;
            if cum_volume > 0.0 {
                finite(cum_pv / cum_volume)
            } else {
                None
            }
        })
        .collect()
}

#[inline]
fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

//! Technical indicator computation over a close-price series.
//!
//! Pure functions, deterministic for a fixed input series. These feed the
//! technicals observation; the agent consumes them as pre-computed values
//! and never recomputes downstream.

use coinsage_core::market::{
    IndicatorSet, MacdLabel, MacdSummary, PricePoint, PriceRange, Volatility,
};

/// RSI over a `period`-bar window using simple moving averages of gains
/// and losses. Returns `None` until enough bars exist. All-gain windows
/// saturate at 100.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let window = &deltas[deltas.len() - period..];

    let avg_gain: f64 = window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Exponential moving average with the standard recursive form,
/// `alpha = 2 / (span + 1)`, seeded from the first value.
fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(prev);
    for v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// MACD(12,26,9): line = EMA12 − EMA26, signal = EMA9 of the line.
pub fn macd(closes: &[f64]) -> Option<MacdSummary> {
    if closes.len() < 2 {
        return None;
    }
    let ema12 = ema(closes, 12);
    let ema26 = ema(closes, 26);
    let line: Vec<f64> = ema12.iter().zip(&ema26).map(|(a, b)| a - b).collect();
    let signal = ema(&line, 9);

    let last_line = *line.last()?;
    let last_signal = *signal.last()?;
    let histogram = last_line - last_signal;

    Some(MacdSummary {
        line: last_line,
        signal: last_signal,
        histogram,
        label: if histogram >= 0.0 {
            MacdLabel::Bullish
        } else {
            MacdLabel::Bearish
        },
    })
}

/// RSI(14) + MACD(12,26,9) bundle. `None` when the series is too short
/// for either indicator.
pub fn indicator_set(closes: &[f64]) -> Option<IndicatorSet> {
    Some(IndicatorSet {
        rsi_14: rsi(closes, 14)?,
        macd: macd(closes)?,
    })
}

/// Window low/high and the last close's distance from both.
pub fn price_range(closes: &[f64]) -> Option<PriceRange> {
    let last = *closes.last()?;
    let low = closes.iter().cloned().fold(f64::INFINITY, f64::min);
    let high = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Some(PriceRange {
        low_usd: low,
        high_usd: high,
        pct_from_low: (low > 0.0).then(|| last / low - 1.0),
        pct_from_high: (high > 0.0).then(|| last / high - 1.0),
    })
}

/// Sample standard deviation of simple daily returns, annualized by √365.
pub fn volatility(closes: &[f64]) -> Volatility {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();

    if returns.len() < 2 {
        return Volatility {
            daily_return_std: None,
            annualized_std: None,
        };
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() as f64 - 1.0);
    let daily = variance.sqrt();

    Volatility {
        daily_return_std: Some(daily),
        annualized_std: Some(daily * 365.0_f64.sqrt()),
    }
}

/// Downsample a series to at most `max_points` by striding.
pub fn downsample(series: &[PricePoint], max_points: usize) -> Vec<PricePoint> {
    if max_points == 0 || series.len() <= max_points {
        return series.to_vec();
    }
    let stride = series.len().div_ceil(max_points).max(1);
    series.iter().step_by(stride).copied().collect()
}

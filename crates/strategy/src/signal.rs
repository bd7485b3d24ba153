//! Pure signal-derivation helpers: momentum majority counting, trend
//! verdicts, volume confirmation and the EMA proximity band.

use common::TrendVerdict;

/// Volume must beat its average by this factor when the filter is on.
const VOLUME_SURGE_FACTOR: f64 = 1.2;

/// Width of the band around the fast EMA inside which an entry is
/// still considered anchored to the trend (0.2%).
const EMA_PROXIMITY: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumDirection {
    Bullish,
    Bearish,
}

/// Majority-rule momentum confirmation over the last
/// `momentum_period + 1` readings.
///
/// Counts pairwise moves in the requested direction; confirmed when
/// the count reaches `(window_len - 1) / 2` (integer floor, so for
/// small windows exactly half the comparisons qualifies). Fewer
/// readings than the window means no confirmation.
pub fn momentum_majority(seq: &[f64], momentum_period: usize, dir: MomentumDirection) -> bool {
    if momentum_period == 0 || seq.len() < momentum_period + 1 {
        return false;
    }

    let window = &seq[seq.len() - momentum_period - 1..];
    let favorable = window
        .windows(2)
        .filter(|pair| match dir {
            MomentumDirection::Bullish => pair[1] > pair[0],
            MomentumDirection::Bearish => pair[1] < pair[0],
        })
        .count();

    favorable >= (window.len() - 1) / 2
}

/// Combined trend verdict from the fast/slow EMA pair and the
/// higher-timeframe EMA. The filter being disabled, or the two
/// timeframes disagreeing, reads as neutral.
pub fn trend_verdict(
    enabled: bool,
    ema_fast: f64,
    ema_slow: f64,
    close: f64,
    higher_tf_ema: f64,
) -> TrendVerdict {
    if !enabled {
        return TrendVerdict::Neutral;
    }

    let primary = if ema_fast > ema_slow {
        TrendVerdict::Bullish
    } else {
        TrendVerdict::Bearish
    };
    let higher = if close > higher_tf_ema {
        TrendVerdict::Bullish
    } else {
        TrendVerdict::Bearish
    };

    if primary == higher {
        primary
    } else {
        TrendVerdict::Neutral
    }
}

/// Volume confirmation: disabled filter always passes; otherwise the
/// bar's volume must exceed its average by the surge factor.
pub fn volume_confirmation(enabled: bool, volume: f64, volume_sma: f64) -> bool {
    if !enabled {
        return true;
    }
    volume > volume_sma * VOLUME_SURGE_FACTOR
}

/// Proximity filter: rejects entries where price has diverged more
/// than the band below (long) or above (short) the fast EMA.
pub fn near_trend_anchor_long(close: f64, ema_fast: f64) -> bool {
    close >= ema_fast * (1.0 - EMA_PROXIMITY)
}

pub fn near_trend_anchor_short(close: f64, ema_fast: f64) -> bool {
    close <= ema_fast * (1.0 + EMA_PROXIMITY)
}

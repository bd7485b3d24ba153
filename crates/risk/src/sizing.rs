//! Risk-based order sizing.
//!
//! `risk_to_qty` sizes a position so a stop-out loses approximately
//! `risk_pct` percent of the given capital after fees. The quantity is
//! monotonically increasing in capital and risk percentage and
//! decreasing in stop distance, and never negative.

use common::{AccountView, ExchangeKind};

/// Fees are paid up to three times over a bracketed trade (entry plus
/// stop or target, with margin for partial fills), so sizing reserves
/// a triple-fee haircut.
const FEE_HAIRCUT_MULT: f64 = 3.0;

/// Quantity purchasable with `size` capital at `price`, fee-adjusted.
pub fn size_to_qty(size: f64, price: f64, fee_rate: f64) -> f64 {
    if price <= 0.0 || !size.is_finite() || size <= 0.0 {
        return 0.0;
    }
    let mut size = size;
    if fee_rate > 0.0 {
        size *= 1.0 - fee_rate * FEE_HAIRCUT_MULT;
    }
    (size / price).max(0.0)
}

/// Quantity such that being stopped out from `entry_price` at
/// `stop_price` loses about `risk_pct` percent of `capital` after
/// fees. A zero stop distance yields zero, not an error.
pub fn risk_to_qty(
    capital: f64,
    risk_pct: f64,
    entry_price: f64,
    stop_price: f64,
    fee_rate: f64,
) -> f64 {
    let risk_per_qty = (entry_price - stop_price).abs();
    if risk_per_qty <= 0.0 || capital <= 0.0 || risk_pct <= 0.0 || entry_price <= 0.0 {
        return 0.0;
    }

    let risk_capital = capital * risk_pct / 100.0;
    // Notional implied by the per-unit risk, never more than the
    // capital itself.
    let size = ((risk_capital / risk_per_qty) * entry_price).min(capital);
    size_to_qty(size, entry_price, fee_rate)
}

/// Largest quantity `fraction` of `capital` buys at `price`.
pub fn max_capital_qty(capital: f64, fraction: f64, price: f64, fee_rate: f64) -> f64 {
    size_to_qty(capital * fraction, price, fee_rate)
}

/// True min against the safety cap. Idempotent: clamping an already
/// clamped quantity changes nothing.
pub fn clamp_qty(qty: f64, cap: f64) -> f64 {
    qty.min(cap)
}

/// Capital figure entries are sized against: plain balance on spot,
/// leveraged available margin on futures.
pub fn deployable_capital<A: AccountView + ?Sized>(account: &A) -> f64 {
    match account.exchange_kind() {
        ExchangeKind::Spot => account.balance(),
        ExchangeKind::Futures => account.leveraged_available_margin(),
    }
}

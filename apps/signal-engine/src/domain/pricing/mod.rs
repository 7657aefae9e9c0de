//! Bracket price calculator.
//!
//! Pure functions that compute target and stop-loss trigger prices from an
//! entry price and a signal's bracket configuration. All prices are rounded
//! to the broker tick size before use.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::order::TxnType;
use crate::domain::signal::BracketMode;

/// Minimum price increment accepted by the broker.
pub const TICK_SIZE: Decimal = dec!(0.05);

/// The two prices bracketing an entry fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPrices {
    /// Take-profit limit price.
    pub target_price: Decimal,
    /// Stop-loss trigger price.
    pub stop_loss_price: Decimal,
}

/// Round a price to the nearest tick (`round(x / 0.05) * 0.05`).
///
/// Midpoints round away from zero, matching the broker's convention.
#[must_use]
pub fn round_to_tick(value: Decimal) -> Decimal {
    ((value / TICK_SIZE)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        * TICK_SIZE
}

/// Compute target and stop-loss prices for a filled entry.
///
/// In PERCENTAGE mode the deltas are percentages of the entry price; in
/// POINTS mode they are absolute. A BUY entry exits above (target) and below
/// (stop); a SELL entry is mirrored.
#[must_use]
pub fn compute_bracket_prices(
    entry_price: Decimal,
    target: Decimal,
    stop_loss: Decimal,
    mode: BracketMode,
    txn_type: TxnType,
) -> BracketPrices {
    let (target_delta, stop_delta) = match mode {
        BracketMode::Percentage => (
            round_to_tick(entry_price * target / dec!(100)),
            round_to_tick(entry_price * stop_loss / dec!(100)),
        ),
        BracketMode::Points => (round_to_tick(target), round_to_tick(stop_loss)),
    };

    match txn_type {
        TxnType::Buy => BracketPrices {
            target_price: entry_price + target_delta,
            stop_loss_price: entry_price - stop_delta,
        },
        TxnType::Sell => BracketPrices {
            target_price: entry_price - target_delta,
            stop_loss_price: entry_price + stop_delta,
        },
    }
}

/// Whether the current LTP has already crossed the target or stop level.
///
/// When true, placing the bracket pair is pointless: one leg would fill
/// immediately and the position should instead be exited at market.
#[must_use]
pub fn level_already_crossed(
    ltp: Decimal,
    prices: BracketPrices,
    txn_type: TxnType,
) -> bool {
    match txn_type {
        TxnType::Buy => ltp >= prices.target_price || ltp <= prices.stop_loss_price,
        TxnType::Sell => ltp <= prices.target_price || ltp >= prices.stop_loss_price,
    }
}

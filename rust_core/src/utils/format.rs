//! Balance formatting and ledger unit conversion.
//!
//! Balances are displayed as fixed-decimal strings. A balance that is not
//! known is `None`, never a zero string.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Drops per XRP
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Format a value with exactly `decimals` places, halves rounded away from zero.
///
/// Rounds the shortest decimal form of `value`, so a balance of exactly
/// `0.03125` shows as `0.0313`. Values outside the decimal range fall back
/// to plain float formatting.
///
/// ```rust
/// use creator_feeds_core::utils::format::format_fixed;
///
/// assert_eq!(format_fixed(1.23456789, 4), "1.2346");
/// assert_eq!(format_fixed(0.03125, 4), "0.0313");
/// assert_eq!(format_fixed(2.0, 2), "2.00");
/// ```
pub fn format_fixed(value: f64, decimals: usize) -> String {
    // f64 Display never uses exponent notation
    match Decimal::from_str(&value.to_string()) {
        Ok(exact) => {
            let rounded = exact.round_dp_with_strategy(
                decimals as u32,
                RoundingStrategy::MidpointAwayFromZero,
            );
            format!("{:.*}", decimals, rounded)
        }
        Err(_) => format!("{:.*}", decimals, value),
    }
}

/// Format an optional balance, keeping "unknown" distinct from zero
pub fn format_balance(value: Option<f64>, decimals: usize) -> Option<String> {
    value.map(|v| format_fixed(v, decimals))
}

/// Convert lamports to SOL
#[inline]
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert drops to XRP
#[inline]
pub fn drops_to_xrp(drops: u64) -> f64 {
    drops as f64 / DROPS_PER_XRP as f64
}

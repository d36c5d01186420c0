//! Long-running feed tasks publishing their state over `watch` channels.

pub mod balance_feed;
mod latest;
pub mod ledger_feed;
pub mod price_feed;

pub use balance_feed::{BalanceFeed, BalanceFeedHandle, BalanceView, BALANCE_DECIMALS};
pub use ledger_feed::{LedgerBalanceFeed, LedgerBalanceHandle, LedgerBalanceView};
pub use price_feed::{PriceFeed, PriceFeedConfig, PriceFeedHandle, PriceFeedState};

pub mod balance_reader;
pub mod coingecko;
pub mod evm;
pub mod price_source;
pub mod solana;
pub mod xrpl;

// Re-export commonly used types
pub use balance_reader::{
    BalanceReader, Ledger, LedgerBalanceReader, LedgerError, BALANCE_FETCH_FAILED,
};
pub use coingecko::CoinGeckoClient;
pub use evm::EvmBalanceClient;
pub use price_source::{PriceFetchError, PriceSource, PRICE_FETCH_FAILED};
pub use solana::SolanaRpcClient;
pub use xrpl::XrplClient;

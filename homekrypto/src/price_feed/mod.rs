//! HKT token price feed.
//!
//! Market-data providers are tried in priority order and the first valid
//! answer replaces the single latest-price record. When every provider
//! fails the previous record is kept and the failure is reported; no price
//! is ever invented. Consumers get the rate as a timestamped [`HktRate`]
//! so staleness stays visible at the point of use.

pub mod errors;
pub mod feed;
pub mod models;
pub mod providers;

pub use errors::{PriceFeedError, PriceFeedResult};
pub use feed::PriceFeed;
pub use models::{HktPriceSnapshot, HktRate};
pub use providers::{CoinGeckoProvider, DexScreenerProvider, PriceProvider};

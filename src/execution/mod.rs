// Trade submission and settlement module
pub mod trader;

pub use trader::TradeExecutor;

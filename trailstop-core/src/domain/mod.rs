//! Domain types for the trailing-stop pipeline.

pub mod bar;
pub mod daily;
pub mod price_table;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use daily::{AssetDay, DailyRow};
pub use price_table::PriceTable;
pub use signal::Signal;
pub use trade::{ExitKind, StrandedEntry, Trade};

/// Asset identifier type alias, e.g. "BTC-USD".
pub type Asset = String;

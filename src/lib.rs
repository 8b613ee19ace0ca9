//! A depth-bounded order book for Binance style market data: full depth snapshots plus
//! best bid / offer updates in between.

pub mod book;
pub mod exchange;
pub mod feed;
pub mod level;
pub mod render;

pub use book::{Book, DEFAULT_DEPTH};
pub use feed::{BookFeed, FeedMessage};
pub use level::{Level, Side};

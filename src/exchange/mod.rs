//! Methods and types for connecting to exchanges

pub mod binance;
pub mod common;

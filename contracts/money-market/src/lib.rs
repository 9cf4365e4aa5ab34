#![no_std]

mod constants;
mod contract;
mod errors;
mod events;
mod fixed;
mod interest;
mod interfaces;
mod liquidation;
mod math;
mod state;
mod storage;
mod transfer;
mod variable;

pub use constants::*;
pub use contract::{MoneyMarket, MoneyMarketClient};
pub use errors::MarketError;
pub use storage::{BorrowSnapshot, FixedBook, FixedLoan, MarketConfig, MarketSnapshot, MarketState};

pub mod error;
pub mod registers;
pub mod asset;
pub mod geometry;
pub mod fsm;
pub mod executor;
pub mod reference;
pub mod driver;
pub mod sweep;

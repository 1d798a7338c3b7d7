// Public API for integration tests and potential library usage

pub mod catalog;
pub mod config;
pub mod error;
pub mod games;
pub mod hub;
pub mod outbox;
pub mod protocol;
pub mod select;
pub mod state;
pub mod tally;
pub mod types;
pub mod ws;

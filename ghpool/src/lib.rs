pub mod client;
pub mod config;
pub mod error;
pub mod queue;
pub mod request;
pub mod token;
pub mod transport;

#[macro_use]
pub mod ui;

pub mod client;
pub mod config;
pub mod errors;
pub mod factory;
pub mod logging;
pub mod ui;
pub mod validation;

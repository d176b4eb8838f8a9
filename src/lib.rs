pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod purchase;
pub mod services;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

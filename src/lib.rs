pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod journal;
pub mod middleware;
pub mod navigation;
pub mod server;
pub mod store;
pub mod time_format;

#[cfg(test)]
pub mod testing;

pub mod api;
pub mod config;
pub mod errors;
pub mod format;
pub mod generator;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod repo;
pub mod server;

#[cfg(test)]
mod testing;

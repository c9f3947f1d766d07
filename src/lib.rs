pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod lines;
pub mod output;
pub mod parser;
pub mod query;
pub mod scheduler;
pub mod services;
pub mod tracker;

//! SIRI situation-exchange feed client.

mod client;

pub use client::SiriFeedClient;

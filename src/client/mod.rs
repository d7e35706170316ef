//! The `client` module defines the broker's view of one connected bus client.

pub mod pubsub_client;
pub use pubsub_client::Client;

#[cfg(test)]
mod tests;

//! The broker: topic routing, retained messages and last-will delivery for
//! every node sharing the bus. The hub node runs it in-process.

pub mod engine;
pub mod message;
pub mod topic;

pub use engine::Broker;

//! # PNT Fabric
//!
//! `pnt_fabric` is the health and status fabric of a precision-timing
//! reference card. Every node on the bus reports its warnings and errors;
//! the hub node hosts the shared broker and keeps the fleet-wide view.
//!
//! ## Core Modules
//!
//! - `bus`: `MessageBus`, the broker connection bridged into a single-threaded
//!   tick loop (one inbound frame dispatched per tick).
//! - `notify`: `NotificationCenter`, which turns log records into
//!   notifications, persists and publishes them, ingests other nodes' reports
//!   and drives the status light.
//! - `link`: `LinkStateMachine`, optical transceiver presence and fault
//!   supervision.
//! - `scheduler`: the fixed-period tick loop driving the components above.
//! - `broker`, `client`, `transport`: the in-process broker served over
//!   WebSockets with retained messages and last-will delivery.
//! - `config`: layered settings (defaults, `config/default.*`, `FABRIC_*`).
//! - `hw`: driver stand-ins for running without board access.
//! - `utils`: logging initialisation, log sinks and timestamp helpers.

pub mod broker;
pub mod bus;
pub mod client;
pub mod config;
pub mod hw;
pub mod link;
pub mod notify;
pub mod scheduler;
pub mod transport;
pub mod utils;

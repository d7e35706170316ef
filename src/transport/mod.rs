//! The `transport` module carries the bus over WebSockets: the JSON wire
//! protocol shared by the broker and `MessageBus`, and the broker's server.

pub mod message;
pub mod websocket;


pub use message::{ClientMessage, ServerMessage, Will};
pub use websocket::{serve, start_websocket_server};

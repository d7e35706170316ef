//! WebSocket transport
//!
//! Accepts bus clients and translates the JSON wire protocol into broker
//! operations:
//! - every socket gets a `Client` registered with the `Broker`
//! - the first frame must be `connect`; anything else is answered with an
//!   error and the socket is closed
//! - a socket that ends without `disconnect` is cleaned up uncleanly, which
//!   publishes its last-will

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::broker::{Broker, message::Message};
use crate::client::Client;
use crate::transport::message::{CONNACK_ACCEPTED, ClientMessage, ServerMessage};

/// Binds `addr` and serves bus clients until the listener fails.
pub async fn start_websocket_server(addr: String, broker: Arc<Mutex<Broker>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Broker listening on ws://{addr}");
    serve(listener, broker).await;
    Ok(())
}

/// Serves bus clients on an already bound listener.
pub async fn serve(listener: TcpListener, broker: Arc<Mutex<Broker>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Accepted connection from {peer}");
                tokio::spawn(handle_connection(stream, broker.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {e}");
                break;
            }
        }
    }
}

fn lock(broker: &Mutex<Broker>) -> MutexGuard<'_, Broker> {
    match broker.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn handle_connection(stream: TcpStream, broker: Arc<Mutex<Broker>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let conn_id = client.id.clone();
    lock(&broker).register_client(client);

    let cleanup_called = Arc::new(AtomicBool::new(false));
    let graceful = Arc::new(AtomicBool::new(false));

    let do_cleanup = {
        let broker = broker.clone();
        let conn_id = conn_id.clone();
        let cleanup_called = cleanup_called.clone();
        let graceful = graceful.clone();

        move || {
            if !cleanup_called.swap(true, Ordering::SeqCst) {
                let mut broker = lock(&broker);
                if graceful.load(Ordering::SeqCst) {
                    broker.disconnect(&conn_id);
                } else {
                    broker.cleanup_client(&conn_id);
                }
            }
        }
    };

    {
        let conn_id = conn_id.clone();
        let do_cleanup = do_cleanup.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {conn_id}: {e}");
                    break;
                }
            }

            do_cleanup();
            debug!("Send loop closed for {conn_id}");
        });
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let mut broker_lock = lock(&broker);
        let connected = match broker_lock.clients.get(&conn_id) {
            Some(client) => client.is_connected(),
            None => break,
        };

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Connect { client_id, will }) => {
                if broker_lock.connect(&conn_id, &client_id, will) != CONNACK_ACCEPTED {
                    break;
                }
            }
            Ok(_) if !connected => {
                warn!("{conn_id} sent a message before connecting");
                if let Some(client) = broker_lock.clients.get(&conn_id) {
                    client.send(&ServerMessage::Error {
                        message: "must connect first".to_string(),
                    });
                }
                break;
            }
            Ok(ClientMessage::Subscribe { topic }) => {
                broker_lock.subscribe(&topic, conn_id.clone());
                debug!("{conn_id} subscribed to {topic}");
            }
            Ok(ClientMessage::Unsubscribe { topic }) => {
                broker_lock.unsubscribe(&topic, &conn_id);
                debug!("{conn_id} unsubscribed from {topic}");
            }
            Ok(ClientMessage::Publish {
                topic,
                payload,
                retain,
            }) => {
                broker_lock.publish(Message {
                    topic,
                    payload,
                    timestamp: 0,
                    retain,
                });
            }
            Ok(ClientMessage::Disconnect {}) => {
                graceful.store(true, Ordering::SeqCst);
                break;
            }
            Err(err) => {
                warn!(
                    "Invalid client message from {conn_id}: {err} | {}",
                    &text.chars().take(100).collect::<String>()
                );
            }
        }
    }

    do_cleanup();
    debug!("{conn_id} closed");
}

//! Network side of the bus.
//!
//! `Network` is the seam between `MessageBus` and the wire. `WsNetwork` runs
//! the WebSocket client on its own thread (a current-thread tokio runtime):
//! the tick thread talks to it through a command channel, and the reader task
//! only ever pushes onto the inbound queue.

use std::thread::JoinHandle;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle as TaskHandle;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::bus::error::BusError;
use crate::bus::frame::{Frame, InboundSender};
use crate::transport::message::{ClientMessage, ServerMessage, Will};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub will: Will,
    pub timeout: Duration,
    /// Tag echoed in the `Disconnected` notification of this session.
    pub session: u64,
}

/// Broker's answer to a session request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAck {
    pub return_code: u8,
}

pub trait Network {
    /// Opens a session, blocking until the broker answers or the request's
    /// timeout expires. Any previous session is dropped without a
    /// `disconnect`.
    fn connect(&mut self, request: ConnectRequest) -> Result<ConnAck, BusError>;

    /// Queues a message on the current session. Messages sent while no
    /// session is open are dropped.
    fn send(&mut self, msg: ClientMessage) -> Result<(), BusError>;
}

enum Command {
    Connect {
        request: ConnectRequest,
        reply: oneshot::Sender<Result<ConnAck, BusError>>,
    },
    Send(ClientMessage),
    Shutdown,
}

/// WebSocket client running on a dedicated thread.
///
/// Dropping it stops the thread without a protocol `disconnect`, so the
/// broker delivers the session's last-will.
pub struct WsNetwork {
    commands: UnboundedSender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl WsNetwork {
    pub fn start(inbound: InboundSender) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::unbounded_channel();
        let thread = std::thread::Builder::new()
            .name("bus-network".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start network runtime: {e}");
                        return;
                    }
                };
                runtime.block_on(network_loop(rx, inbound));
            })?;

        Ok(Self {
            commands,
            thread: Some(thread),
        })
    }
}

impl Network for WsNetwork {
    fn connect(&mut self, request: ConnectRequest) -> Result<ConnAck, BusError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::Connect { request, reply })
            .map_err(|_| BusError::NetworkStopped)?;
        answer.blocking_recv().map_err(|_| BusError::NetworkStopped)?
    }

    fn send(&mut self, msg: ClientMessage) -> Result<(), BusError> {
        self.commands
            .send(Command::Send(msg))
            .map_err(|_| BusError::NetworkStopped)
    }
}

impl Drop for WsNetwork {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Network thread panicked");
            }
        }
        debug!("Network thread stopped");
    }
}

struct Session {
    sink: WsSink,
    reader: TaskHandle<()>,
}

impl Session {
    fn close(self) {
        // no `disconnect` on purpose: the broker must see an unclean exit
        self.reader.abort();
        drop(self.sink);
    }
}

async fn network_loop(mut commands: UnboundedReceiver<Command>, inbound: InboundSender) {
    let mut session: Option<Session> = None;

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect { request, reply } => {
                if let Some(old) = session.take() {
                    old.close();
                }
                let result = match open_session(&request).await {
                    Ok((sink, source, ack)) => {
                        let reader =
                            tokio::spawn(read_session(source, inbound.clone(), request.session));
                        session = Some(Session { sink, reader });
                        Ok(ack)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Send(msg) => {
                let Some(current) = session.as_mut() else {
                    debug!("Dropping message while not connected: {msg:?}");
                    continue;
                };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize outbound message: {e}");
                        continue;
                    }
                };
                if let Err(e) = current.sink.send(WsMessage::text(text)).await {
                    debug!("Failed to send to broker: {e}");
                }
            }
            Command::Shutdown => break,
        }
    }

    if let Some(old) = session.take() {
        old.close();
    }
}

async fn open_session(request: &ConnectRequest) -> Result<(WsSink, WsSource, ConnAck), BusError> {
    let url = format!("ws://{}:{}", request.host, request.port);

    let (ws, _) = match timeout(request.timeout, connect_async(url.as_str())).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            return Err(BusError::connection(format!(
                "broker not found at {}:{}: {e}",
                request.host, request.port
            )));
        }
        Err(_) => {
            return Err(BusError::connection(format!(
                "timed out connecting to {}:{}",
                request.host, request.port
            )));
        }
    };

    let (mut sink, mut source) = ws.split();
    let hello = ClientMessage::Connect {
        client_id: request.client_id.clone(),
        will: Some(request.will.clone()),
    };
    sink.send(WsMessage::text(serde_json::to_string(&hello)?))
        .await
        .map_err(|e| BusError::connection(e.to_string()))?;

    let ack = match timeout(request.timeout, wait_for_ack(&mut source)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(BusError::connection(
                "timed out waiting for connection acknowledgment",
            ));
        }
    };
    Ok((sink, source, ack))
}

async fn wait_for_ack(source: &mut WsSource) -> Result<ConnAck, BusError> {
    while let Some(frame) = source.next().await {
        let frame = frame.map_err(|e| BusError::connection(e.to_string()))?;
        let Ok(text) = frame.to_text() else {
            continue;
        };
        if let Ok(ServerMessage::ConnAck { return_code }) = serde_json::from_str(text) {
            return Ok(ConnAck { return_code });
        }
    }
    Err(BusError::connection(
        "connection closed before acknowledgment",
    ))
}

async fn read_session(mut source: WsSource, inbound: InboundSender, session: u64) {
    while let Some(frame) = source.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Broker connection error: {e}");
                break;
            }
        };
        if !frame.is_text() {
            continue;
        }
        let Ok(text) = frame.to_text() else {
            continue;
        };
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::Message { topic, payload, .. }) => {
                inbound.on_inbound_frame(Frame::new(topic, payload));
            }
            Ok(ServerMessage::Error { message }) => {
                warn!("Broker reported an error: {message}");
            }
            Ok(ServerMessage::ConnAck { .. }) => {}
            Err(e) => debug!("Ignoring unreadable broker message: {e}"),
        }
    }
    info!("Broker session {session} ended");
    inbound.on_disconnect(session);
}

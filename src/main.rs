//! CLI for the PNT status fabric
//!
//! Subcommands:
//! - `node`: run a node (and the broker, when embedded)
//! - `broker`: run only the WebSocket broker
//! - `publish-warning`: publish a synthetic warning (useful for smoke tests)

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use clap::Parser;
use pnt_fabric::broker::Broker;
use pnt_fabric::bus::{MessageBus, NodeIdentity, topics};
use pnt_fabric::config::{Settings, load_config, resolve_mac_address};
use pnt_fabric::hw::{LogIndicator, NullTransceiver};
use pnt_fabric::link::LinkStateMachine;
use pnt_fabric::notify::{Notification, NotificationCenter, Severity};
use pnt_fabric::scheduler::Scheduler;
use pnt_fabric::transport::websocket::{serve, start_websocket_server};
use pnt_fabric::utils::{LogSinks, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pnt-fabric")]
enum Command {
    /// Run the node: link supervision, notification center and status light
    Node,
    /// Start the WebSocket broker only
    Broker,
    /// Publish a fake warning on `/status/warnings`
    PublishWarning {
        /// Broker host (default: from configuration)
        #[arg(long)]
        host: Option<String>,
        /// Broker port (default: from configuration)
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value = "test node")]
        node_name: String,
        #[arg(long, default_value = "01:23:45:67:89:A0")]
        mac_address: String,
        #[arg(long, default_value = "test category")]
        category: String,
        #[arg(long, default_value = "Ran out of tea")]
        message: String,
    },
}

fn main() {
    dotenvy::dotenv().ok();

    let sinks = LogSinks::new();
    logging::init("info", sinks.clone());

    let cmd = Command::parse();

    if let Err(e) = run(cmd, sinks) {
        error!("Failed: {}", e);
        std::process::exit(1);
    }
}

fn run(cmd: Command, sinks: LogSinks) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_config()?;

    match cmd {
        Command::Node => run_node(settings, sinks),
        Command::Broker => run_broker(settings),
        Command::PublishWarning {
            host,
            port,
            node_name,
            mac_address,
            category,
            message,
        } => {
            let host = host.unwrap_or(settings.broker.host);
            let port = port.unwrap_or(settings.broker.port);
            let warning = Notification::new(
                Severity::Warning,
                &mac_address,
                &node_name,
                &category,
                &message,
            );
            publish_once(&host, port, &warning)
        }
    }
}

fn run_node(settings: Settings, sinks: LogSinks) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    if settings.broker.embedded {
        let addr = settings.broker.bind_addr();
        let listener = runtime.block_on(tokio::net::TcpListener::bind(&addr))?;
        info!("Embedded broker listening on {}", addr);
        let broker = Arc::new(Mutex::new(Broker::new()));
        runtime.spawn(serve(listener, broker));
    }

    let identity = NodeIdentity::new(
        resolve_mac_address(&settings.node),
        settings.node.name.clone(),
    );
    info!(
        "Starting node {} ({})",
        identity.node_name, identity.mac_address
    );

    let bus = MessageBus::over_websocket(settings.broker.connect_timeout())?;
    let mut center = NotificationCenter::create(
        &settings,
        identity,
        bus,
        LogIndicator::new(&settings.indicator),
    );
    sinks.register(center.sink());

    let mut scheduler = Scheduler::new(settings.scheduler.tick_period());
    let running = scheduler.running_flag();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Exiting gracefully.");
            running.store(false, Ordering::SeqCst);
        }
    });

    center.start()?;

    scheduler
        .add("link", Box::new(LinkStateMachine::new(NullTransceiver::default())))
        .add("notifications", Box::new(center));
    scheduler.run();

    Ok(())
}

fn run_broker(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let addr = settings.broker.bind_addr();
    let broker = Arc::new(Mutex::new(Broker::new()));

    runtime.block_on(serve_until_shutdown(addr, broker))
}

async fn serve_until_shutdown(
    addr: String,
    broker: Arc<Mutex<Broker>>,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::select! {
        result = start_websocket_server(addr, broker) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
    Ok(())
}

/// Connects, publishes `notification` once and disconnects cleanly (so no
/// last-will is sent for the fake node).
fn publish_once(
    host: &str,
    port: u16,
    notification: &Notification,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(publish_warning(host, port, notification))?;
    info!("Published warning to {}:{}", host, port);
    Ok(())
}

async fn publish_warning(
    host: &str,
    port: u16,
    notification: &Notification,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use pnt_fabric::transport::{ClientMessage, ServerMessage};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let url = format!("ws://{host}:{port}");
    let (mut ws_stream, _response) = connect_async(url.as_str()).await?;

    let hello = ClientMessage::Connect {
        client_id: notification.mac_address.clone(),
        will: None,
    };
    ws_stream
        .send(WsMessage::text(serde_json::to_string(&hello)?))
        .await?;

    match ws_stream.next().await {
        Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ServerMessage>(&text)? {
            ServerMessage::ConnAck { return_code: 0 } => {}
            other => return Err(format!("broker refused connection: {other:?}").into()),
        },
        other => return Err(format!("no acknowledgment from broker: {other:?}").into()),
    }

    let publish = ClientMessage::Publish {
        topic: topics::WARNINGS.to_string(),
        payload: serde_json::to_string(notification)?,
        retain: false,
    };
    ws_stream
        .send(WsMessage::text(serde_json::to_string(&publish)?))
        .await?;
    ws_stream
        .send(WsMessage::text(serde_json::to_string(
            &ClientMessage::Disconnect {},
        )?))
        .await?;
    let _ = ws_stream.close(None).await;

    Ok(())
}

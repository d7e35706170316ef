use super::pubsub_client::Client;
use crate::transport::message::ServerMessage;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("conn-"));
    assert!(!client.is_connected());
    assert!(client.will.is_none());
}

#[test]
fn test_client_send_serializes_server_message() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);

    assert!(client.send(&ServerMessage::ConnAck { return_code: 0 }));

    let sent = rx.try_recv().unwrap();
    let parsed: ServerMessage = serde_json::from_str(sent.to_text().unwrap()).unwrap();
    assert_eq!(parsed, ServerMessage::ConnAck { return_code: 0 });
}

#[test]
fn test_client_send_after_receiver_dropped() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    drop(rx);

    assert!(!client.send(&ServerMessage::Error {
        message: "gone".to_string()
    }));
}

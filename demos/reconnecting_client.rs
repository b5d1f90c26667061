//! Reconnecting signaling client example
//!
//! Keeps a connection to a signaling server open, joins a room, prints
//! every lifecycle event and inbound message, and closes on Ctrl-C.
//!
//! Run with: cargo run --example reconnecting_client -- ws://127.0.0.1:4443

use resock::core::util::generate_random_number;
use resock::{ConnectParams, EventKind, Message, Transport, TransportEvent};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:4443".to_string());

    let params = ConnectParams::new()
        .with_query("roomId", "demo")
        .with_query("peerId", format!("peer-{}", generate_random_number()))
        .with_connect_timeout(Duration::from_secs(5));

    let transport = Transport::builder(url)
        .params(params)
        .on(EventKind::Open, |_| println!("[open] connected"))
        .on(EventKind::Disconnect, |event| {
            if let TransportEvent::Disconnect { reason } = event {
                println!("[disconnect] {}", reason);
            }
        })
        .on(EventKind::Reconnect, |_| println!("[reconnect] socket retried its handshake"))
        .on(EventKind::Failed, |event| eprintln!("[failed] {:?}", event))
        .on(EventKind::Close, |_| println!("[close] transport closed"))
        .build()?;

    transport.on_message(|message| match message {
        Message::Request(request) => {
            println!("[request {}] {} {}", request.id, request.method, request.data)
        }
        Message::Response(response) => {
            println!("[response {}] ok={}", response.id, response.ok)
        }
        Message::Notification(notification) => {
            println!("[notification] {} {}", notification.method, notification.data)
        }
    });

    println!("Connecting to {} (Ctrl-C to quit)", transport.url());
    transport.send(&Message::request("join", Some(json!({"displayName": "demo"}))))?;

    tokio::signal::ctrl_c().await?;
    println!(
        "Closing after {} reconnection attempts",
        transport.reconnection_attempts()
    );
    transport.close();

    Ok(())
}

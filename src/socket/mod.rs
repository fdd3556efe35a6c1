//! Real-time socket layer: transport connector plus event normalization

pub mod connector;
pub mod events;

pub use connector::{ConnState, Connector, MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL};
pub use events::{ClientEvent, OutboundEvent};

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use crate::auth::TokenStore;
use crate::config::Config;

/// Connect to the push socket and print normalized events until Ctrl-C.
pub async fn listen() -> Result<()> {
    let config = Config::load()?;
    let token = config.get_access_token().map(|t| t.token);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Keep one sender alive so the connector does not see a closed channel.
    let _outbound_tx = outbound_tx;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut connector = Connector::new(config.socket_url());
    let run = connector.run(token, events_tx, &mut outbound_rx, &mut shutdown_rx);
    tokio::pin!(run);

    println!("Listening for events... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            result = &mut run => {
                result?;
                return Ok(());
            }
            event = events_rx.recv() => {
                match event {
                    Some(event) => print_event(&event),
                    None => return Ok(()),
                }
            }
        }
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Connected => println!("[conn] connected"),
        ClientEvent::Disconnected => println!("[conn] disconnected"),
        ClientEvent::MessageReceived(msg) => {
            let sender = msg
                .author
                .as_ref()
                .map(|a| a.label().to_string())
                .unwrap_or_else(|| msg.user_id.clone());
            println!("[msg] {} in {}: {}", sender, msg.chat_id, msg.content);
        }
        ClientEvent::PresenceChanged { user_id, online, .. } => {
            let state = if *online { "online" } else { "offline" };
            println!("[presence] {} is {}", user_id, state);
        }
        ClientEvent::TypingChanged { chat_id, user_id, is_typing } => {
            if *is_typing {
                println!("[typing] {} is typing in {}", user_id, chat_id);
            } else {
                println!("[typing] {} stopped typing in {}", user_id, chat_id);
            }
        }
    }
}

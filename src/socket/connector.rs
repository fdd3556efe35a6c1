//! WebSocket transport connector with bounded reconnect
//!
//! Owns the single real-time connection. On transport failure or a
//! server-initiated close it reconnects at a fixed interval up to a bounded
//! number of attempts, then stays disconnected until `run` is called again.
//! An explicit disconnect (the shutdown signal) tears the connection down
//! deterministically and cancels any pending reconnect timer.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::events::{normalize, ClientEvent, OutboundEvent};
use crate::sync::SyncError;

/// Fixed delay between reconnect attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
/// Reconnect attempts before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnState {
    #[default]
    Idle,
    Connecting,
    Connected,
    /// Transport lost; either waiting out the reconnect interval or, with
    /// attempts exhausted, terminal until `run` is called again.
    Disconnected,
}

/// Reconnect bookkeeping, separate from the socket so the policy is
/// testable on its own.
#[derive(Debug)]
pub struct ReconnectPolicy {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` when attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.interval)
    }

    /// Called after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(RECONNECT_INTERVAL, MAX_RECONNECT_ATTEMPTS)
    }
}

/// Why one socket session ended.
enum SessionEnd {
    /// Explicit disconnect. Do not reconnect.
    Shutdown,
    /// Server close or peer hangup. Should reconnect.
    Dropped,
}

/// The transport connector.
pub struct Connector {
    socket_url: String,
    state: ConnState,
    policy: ReconnectPolicy,
}

impl Connector {
    pub fn new(socket_url: String) -> Self {
        Self {
            socket_url,
            state: ConnState::Idle,
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Connect and run until explicitly disconnected or attempts run out.
    ///
    /// Normalized events (and `Connected`/`Disconnected` lifecycle markers)
    /// go out on `events`; frames to send arrive on `outbound`; flipping
    /// `shutdown` to `true` is the explicit disconnect. Safe to signal
    /// shutdown at any point, including mid-backoff.
    pub async fn run(
        &mut self,
        token: Option<String>,
        events: mpsc::UnboundedSender<ClientEvent>,
        outbound: &mut mpsc::UnboundedReceiver<OutboundEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), SyncError> {
        let token = token.ok_or(SyncError::AuthMissing)?;

        loop {
            self.state = ConnState::Connecting;
            let result = self.session(&token, &events, outbound, shutdown).await;
            let was_connected = self.state == ConnState::Connected;

            match &result {
                Ok(SessionEnd::Shutdown) => {
                    self.state = ConnState::Idle;
                    if was_connected {
                        let _ = events.send(ClientEvent::Disconnected);
                    }
                    return Ok(());
                }
                Ok(SessionEnd::Dropped) | Err(_) => {
                    self.state = ConnState::Disconnected;
                    if was_connected {
                        let _ = events.send(ClientEvent::Disconnected);
                    }
                    if let Err(e) = &result {
                        tracing::warn!("Socket session failed: {}", e);
                    }

                    match self.policy.next_delay() {
                        Some(delay) => {
                            tracing::info!(
                                "Reconnecting in {}s (attempt {}/{})",
                                delay.as_secs(),
                                self.policy.attempts(),
                                MAX_RECONNECT_ATTEMPTS
                            );
                            tokio::select! {
                                _ = time::sleep(delay) => {}
                                _ = shutdown.changed() => {
                                    if *shutdown.borrow() {
                                        self.state = ConnState::Idle;
                                        return Ok(());
                                    }
                                }
                            }
                        }
                        None => {
                            tracing::warn!(
                                "Reconnect attempts exhausted after {} tries, staying disconnected",
                                MAX_RECONNECT_ATTEMPTS
                            );
                            return Err(SyncError::TransportFailure(
                                "reconnect attempts exhausted".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// One full socket session: connect, then pump frames both ways.
    async fn session(
        &mut self,
        token: &str,
        events: &mpsc::UnboundedSender<ClientEvent>,
        outbound: &mut mpsc::UnboundedReceiver<OutboundEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, SyncError> {
        // Auth is a connection-establishment parameter, not a per-frame field.
        let url = format!("{}/?token={}", self.socket_url, token);
        tracing::info!("Connecting socket to {}", self.socket_url);

        let (mut ws, response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| SyncError::TransportFailure(format!("connect failed: {}", e)))?;

        tracing::info!("Socket connected (status={})", response.status());
        self.state = ConnState::Connected;
        self.policy.reset();
        let _ = events.send(ClientEvent::Connected);

        loop {
            tokio::select! {
                frame = ws.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            tracing::debug!("WS recv: {}", text);
                            if let Some(event) = normalize(&text) {
                                let _ = events.send(event);
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            if let Err(e) = ws.send(WsMessage::Pong(data)).await {
                                return Err(SyncError::TransportFailure(
                                    format!("pong send failed: {}", e),
                                ));
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            tracing::info!("Socket closed by server: {:?}", frame);
                            return Ok(SessionEnd::Dropped);
                        }
                        Some(Ok(other)) => {
                            tracing::debug!("WS frame (ignored): {:?}", other);
                        }
                        Some(Err(e)) => {
                            return Err(SyncError::TransportFailure(
                                format!("recv error: {}", e),
                            ));
                        }
                        None => {
                            return Ok(SessionEnd::Dropped);
                        }
                    }
                }
                cmd = outbound.recv() => {
                    match cmd {
                        Some(event) => {
                            let frame = event.to_frame();
                            tracing::debug!("WS send: {}", frame);
                            if let Err(e) = ws.send(WsMessage::Text(frame)).await {
                                return Err(SyncError::TransportFailure(
                                    format!("send failed: {}", e),
                                ));
                            }
                        }
                        // All senders gone: nobody left to talk, tear down.
                        None => {
                            let _ = ws.close(None).await;
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        let _ = ws.close(None).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_yields_fixed_interval_up_to_cap() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(5), 3);
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(), None);
        // Exhausted stays exhausted until reset.
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn policy_reset_restores_attempts() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(1), 1);
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_none());
        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert!(policy.next_delay().is_some());
    }

    #[tokio::test]
    async fn run_without_token_is_auth_missing() {
        let mut connector = Connector::new("ws://localhost:1".to_string());
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let result = connector
            .run(None, events_tx, &mut outbound_rx, &mut shutdown_rx)
            .await;
        assert!(matches!(result, Err(SyncError::AuthMissing)));
        assert_eq!(connector.state(), ConnState::Idle);
    }

    #[test]
    fn connector_starts_idle() {
        let connector = Connector::new("ws://localhost:1".to_string());
        assert_eq!(connector.state(), ConnState::Idle);
    }
}

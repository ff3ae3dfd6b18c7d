//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Frames werden ueber den `FrameCodec` gelesen, an den
//! `MessageDispatcher` gegeben und die Antwort auf derselben Verbindung
//! zurueckgeschrieben. Broadcast-Ereignisse kommen ueber die Send-Queue
//! aus dem `EventBroadcaster`.
//!
//! Handshake und Trennen einer Verbindung laufen beide in diesem Task und
//! sind damit fuer diese Verbindung linearisiert: das Aufraeumen beginnt
//! erst wenn kein Handshake mehr in Arbeit ist.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_ms` einen Ping
//! - kommt `keepalive_ms + ping_timeout_ms` lang kein Frame, wird getrennt

use futures_util::{SinkExt, StreamExt};
use rollcall_core::types::ConnectionId;
use rollcall_protocol::{control::ControlMessage, wire::FrameCodec};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
    connection_id: ConnectionId,
    sende_rx: mpsc::Receiver<ControlMessage>,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection und legt ihre Send-Queue an
    ///
    /// Ab hier zaehlt die Verbindung gegen `max_clients`, auch wenn ihr
    /// Task noch nicht laeuft.
    pub fn neu(
        state: Arc<SignalingState>,
        peer_addr: SocketAddr,
        connection_id: ConnectionId,
    ) -> Self {
        let sende_rx = state.lifecycle.verbunden(&connection_id);
        Self {
            state,
            peer_addr,
            connection_id,
            sende_rx,
        }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis die Gegenseite trennt, der Keepalive ablaeuft oder ein
    /// Shutdown-Signal eingeht. Das Aufraeumen (Registry, Broadcast an die
    /// uebrigen Clients) passiert in jedem Fall.
    pub async fn verarbeiten<S>(
        mut self,
        stream: S,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::info!(peer = %self.peer_addr, connection_id = %self.connection_id, "Neue Verbindung");

        let codec = FrameCodec::with_max_size(self.state.config.max_frame_bytes);
        let mut framed = Framed::new(stream, codec);

        let ergebnis = self.schleife(&mut framed, &mut shutdown_rx).await;

        self.state.lifecycle.getrennt(&self.connection_id);

        match &ergebnis {
            Ok(()) => {
                tracing::info!(connection_id = %self.connection_id, "Verbindungs-Task beendet")
            }
            Err(e) => tracing::warn!(
                connection_id = %self.connection_id,
                fehler = %e,
                "Verbindungs-Task mit Fehler beendet"
            ),
        }
        ergebnis
    }

    async fn schleife<S>(
        &mut self,
        framed: &mut Framed<S, FrameCodec>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SignalingResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let config = Arc::clone(&self.state.config);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = DispatcherContext {
            peer_addr: self.peer_addr,
            connection_id: self.connection_id.clone(),
            user_id: None,
        };

        let mut keepalive =
            tokio::time::interval_at(Instant::now() + config.keepalive(), config.keepalive());
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut letzter_empfang = Instant::now();
        let mut ping_request_id: u32 = 0;

        loop {
            let frist = letzter_empfang + config.verbindungs_timeout();

            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                connection_id = %self.connection_id,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(nachricht, &mut ctx) {
                                framed
                                    .send(antwort)
                                    .await
                                    .map_err(|e| SignalingError::SendFehler(e.to_string()))?;
                            }
                        }
                        Some(Err(e)) => return Err(SignalingError::aus_lesefehler(e)),
                        None => {
                            tracing::info!(connection_id = %self.connection_id, "Verbindung vom Client getrennt");
                            return Ok(());
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Broadcaster
                Some(ausgehend) = self.sende_rx.recv() => {
                    framed
                        .send(ausgehend)
                        .await
                        .map_err(|e| SignalingError::SendFehler(e.to_string()))?;
                }

                // Keepalive-Ping
                _ = keepalive.tick() => {
                    ping_request_id = ping_request_id.wrapping_add(1);
                    let ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                    framed
                        .send(ControlMessage::ping(ping_request_id, ts))
                        .await
                        .map_err(|e| SignalingError::SendFehler(e.to_string()))?;
                }

                // Kein Lebenszeichen innerhalb des Fensters
                _ = tokio::time::sleep_until(frist) => {
                    tracing::warn!(connection_id = %self.connection_id, "Verbindungs-Timeout");
                    return Err(SignalingError::Timeout(
                        config.keepalive_ms + config.ping_timeout_ms,
                    ));
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(connection_id = %self.connection_id, "Shutdown-Signal – Verbindung wird getrennt");
                        return Ok(());
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

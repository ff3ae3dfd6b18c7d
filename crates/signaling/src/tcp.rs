//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer `ClientConnection`.
//! Jede Verbindung bekommt beim Accept eine frische `ConnectionId`.
//!
//! Die Send-Queue wird noch in der Accept-Schleife angelegt, damit ein
//! Ansturm neuer Verbindungen `max_clients` nicht ueberholen kann. Alle
//! Verbindungs-Tasks liegen in einem `JoinSet`; nach dem Shutdown wartet
//! der Server bis jede Verbindung aufgeraeumt hat.

use futures_util::SinkExt;
use rollcall_core::types::ConnectionId;
use rollcall_protocol::control::{ControlMessage, ErrorCode, BROADCAST_REQUEST_ID};
use rollcall_protocol::wire::FrameCodec;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
    bind_addr: SocketAddr,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den TCP-Listener und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.starten_mit_listener(listener, shutdown_rx).await
    }

    /// Wie `starten`, mit bereits gebundenem Listener (Tests, Port 0)
    pub async fn starten_mit_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "TCP Signaling-Server gestartet");

        let mut verbindungen: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            // Client-Limit pruefen
                            let offen = self.state.broadcaster.verbindung_anzahl() as u32;
                            if offen >= self.state.config.max_clients {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_clients,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                verbindungen.spawn(async move {
                                    let mut framed = Framed::new(stream, FrameCodec::new());
                                    let _ = framed
                                        .send(ControlMessage::error(
                                            BROADCAST_REQUEST_ID,
                                            ErrorCode::ServerFull,
                                            "Server voll",
                                        ))
                                        .await;
                                });
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let connection_id = ConnectionId::new();
                            tracing::debug!(peer = %peer_addr, connection_id = %connection_id, "Verbindung akzeptiert");

                            // Belegt den Slot sofort, noch vor dem Spawn
                            let verbindung = ClientConnection::neu(
                                Arc::clone(&self.state),
                                peer_addr,
                                connection_id,
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();

                            verbindungen.spawn(async move {
                                // Fehler sind bereits in der Verbindung geloggt
                                let _ = verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Beendete Verbindungs-Tasks einsammeln
                Some(_) = verbindungen.join_next(), if !verbindungen.is_empty() => {}

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        let offen = verbindungen.len();
        while verbindungen.join_next().await.is_some() {}
        tracing::info!(verbindungen = offen, "TCP Signaling-Server gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

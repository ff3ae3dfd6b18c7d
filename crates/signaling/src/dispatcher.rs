//! Message-Dispatcher – Routet ControlMessages einer Verbindung
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection und
//! gibt die Antwort zurueck, die nur an diese Verbindung geht.
//!
//! - `Handshake` -> Lebenszyklus-Manager, Antwort `HandshakeResponse`
//! - `Ping`      -> `Pong`
//! - `Pong`      -> keine Antwort
//! - alles andere ist eine reine Server->Client-Nachricht und wird mit
//!   `INVALID_REQUEST` beantwortet

use rollcall_core::types::{ConnectionId, UserId};
use rollcall_protocol::control::{ControlMessage, ControlPayload, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    /// Peer-Adresse (nur fuer Logs)
    pub peer_addr: SocketAddr,
    /// Vom Transport vergebene Kennung
    pub connection_id: ConnectionId,
    /// Identitaet nach erfolgreichem Handshake
    pub user_id: Option<UserId>,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll.
    pub fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;

        match message.payload {
            ControlPayload::Handshake => {
                let ergebnis = self.state.lifecycle.handshake(&ctx.connection_id);
                ctx.user_id = Some(ergebnis.user_id);
                Some(ControlMessage::handshake_response(
                    request_id,
                    ergebnis.user_id,
                    ergebnis.verbindungen,
                ))
            }

            ControlPayload::Ping(ping) => {
                let server_ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                Some(ControlMessage::pong(request_id, ping.timestamp_ms, server_ts))
            }

            ControlPayload::Pong(_) => {
                tracing::trace!(connection_id = %ctx.connection_id, "Pong empfangen");
                None
            }

            ControlPayload::HandshakeResponse(_)
            | ControlPayload::Event(_)
            | ControlPayload::Error(_) => {
                tracing::warn!(
                    connection_id = %ctx.connection_id,
                    peer = %ctx.peer_addr,
                    request_id,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

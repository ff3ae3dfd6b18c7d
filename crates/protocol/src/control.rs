//! Control-Protokoll (TCP)
//!
//! Definiert alle Nachrichten die ueber die TCP-Verbindung zwischen Client
//! und Server ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`
//! - Broadcast-Ereignisse tragen `request_id = 0`
//! - JSON-Serialisierung via serde, Tagged Enums fuer typsichere Nachrichtentypen
//!
//! ## Oeffentliche Ereignisse
//! - `handshake` – Client fragt seine Identitaet an, Antwort `(uid, users)`
//! - `user_connected` – Broadcast, Daten: alle verbundenen ConnectionIds
//! - `user_disconnected` – Broadcast, Daten: die getrennte UserId

use rollcall_core::types::{ConnectionId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ereignis-Namen
// ---------------------------------------------------------------------------

/// Namen der Ereignisse an der oeffentlichen Schnittstelle
pub mod ereignisse {
    /// Neue Sitzung registriert (an alle anderen)
    pub const USER_CONNECTED: &str = "user_connected";
    /// Sitzung beendet (an alle verbleibenden)
    pub const USER_DISCONNECTED: &str = "user_disconnected";
}

/// Request-ID fuer unaufgeforderte Server-Nachrichten
pub const BROADCAST_REQUEST_ID: u32 = 0;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    ServerFull,
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Antwort auf einen Handshake
///
/// `users` enthaelt alle aktuell registrierten ConnectionIds in
/// Registry-Reihenfolge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Logische Identitaet des Clients
    pub uid: UserId,
    /// Alle verbundenen ConnectionIds
    pub users: Vec<ConnectionId>,
}

// ---------------------------------------------------------------------------
// Benanntes Ereignis (Broadcast)
// ---------------------------------------------------------------------------

/// Benanntes Ereignis mit optionalen Daten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Ereignis-Name, z.B. `user_connected`
    pub name: String,
    /// Nutzdaten (fehlen wenn ohne Payload gesendet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl EventMessage {
    /// Deserialisiert die Nutzdaten in einen konkreten Typ
    ///
    /// Gibt `None` zurueck wenn keine Daten vorhanden sind oder sie nicht passen.
    pub fn daten_als<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Presence
    Handshake,
    HandshakeResponse(HandshakeResponse),
    Event(EventMessage),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Anfrage traegt eine `request_id` die der Client vergibt.
/// Der Server kopiert die ID in die Antwort damit der Client
/// Request und Response zuordnen kann.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt eine Handshake-Anfrage
    pub fn handshake(request_id: u32) -> Self {
        Self::new(request_id, ControlPayload::Handshake)
    }

    /// Erstellt eine Handshake-Antwort
    pub fn handshake_response(request_id: u32, uid: UserId, users: Vec<ConnectionId>) -> Self {
        Self::new(
            request_id,
            ControlPayload::HandshakeResponse(HandshakeResponse { uid, users }),
        )
    }

    /// Erstellt ein benanntes Broadcast-Ereignis
    pub fn event(name: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::new(
            BROADCAST_REQUEST_ID,
            ControlPayload::Event(EventMessage {
                name: name.into(),
                data,
            }),
        )
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Presence-Ereignisse
//!
//! Der Lebenszyklus-Manager veroeffentlicht bei jeder Aenderung der
//! Mitgliedschaft ein `PresenceEvent`. Abonnenten innerhalb des Prozesses
//! (Metriken, Logging) lesen sie ueber einen tokio-Broadcast-Kanal.

use crate::types::{ConnectionId, UserId};
use serde::{Deserialize, Serialize};

/// Aenderungen an der Menge der verbundenen Identitaeten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceEvent {
    /// Neue Identitaet vergeben und registriert
    SitzungErstellt {
        user_id: UserId,
        connection_id: ConnectionId,
        online: usize,
    },
    /// Handshake einer bereits bekannten Verbindung
    SitzungWiederhergestellt {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    /// Identitaet nach dem Trennen aus der Registry entfernt
    SitzungBeendet {
        user_id: UserId,
        connection_id: ConnectionId,
        online: usize,
    },
}

impl PresenceEvent {
    /// Gibt die betroffene Identitaet zurueck
    pub fn user_id(&self) -> UserId {
        match self {
            Self::SitzungErstellt { user_id, .. }
            | Self::SitzungWiederhergestellt { user_id, .. }
            | Self::SitzungBeendet { user_id, .. } => *user_id,
        }
    }

    /// Anzahl der Online-Sitzungen nach dem Ereignis (falls bekannt)
    pub fn online(&self) -> Option<usize> {
        match self {
            Self::SitzungErstellt { online, .. } | Self::SitzungBeendet { online, .. } => {
                Some(*online)
            }
            Self::SitzungWiederhergestellt { .. } => None,
        }
    }
}

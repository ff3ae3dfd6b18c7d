//! Identifikationstypen fuer Rollcall
//!
//! Zwei Arten von Kennungen werden strikt getrennt:
//! - `UserId` – logische Identitaet eines Clients, ueberlebt Reconnects
//! - `ConnectionId` – vom Transport vergebene, fluechtige Verbindungs-Kennung
//!
//! Beide verwenden das Newtype-Pattern um Verwechslungen zur Compilezeit
//! auszuschliessen. Auf dem Draht erscheinen beide als einfache Strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logische Identitaet einer Sitzung
///
/// Wird beim ersten Handshake vergeben, nie veraendert und nach dem
/// Trennen nicht wiederverwendet. 128 Bit Zufall (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Transport-Kennung einer einzelnen Verbindung
///
/// Nur fuer die Lebensdauer der Verbindung gueltig. Der Inhalt ist fuer
/// den Kern undurchsichtig; der TCP-Transport vergibt UUID-Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Gibt die Kennung als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

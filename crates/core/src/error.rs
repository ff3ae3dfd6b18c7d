//! Fehlertypen fuer Rollcall
//!
//! Der Presence-Kern selbst (Registry, Handshake, Broadcast) kennt keine
//! Fehler. Transportfehler liegen in `rollcall-signaling`, hier bleiben
//! Konfiguration und der Uebergang zu `anyhow`.

use thiserror::Error;

/// Globaler Result-Alias fuer Rollcall
pub type Result<T> = std::result::Result<T, RollcallError>;

/// Fehler beim Aufbau des Rollcall-Systems
#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RollcallError {
    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = RollcallError::konfiguration("keepalive_ms darf nicht 0 sein");
        assert_eq!(
            e.to_string(),
            "Konfigurationsfehler: keepalive_ms darf nicht 0 sein"
        );
    }

    #[test]
    fn anyhow_wird_durchgereicht() {
        let e: RollcallError = anyhow::anyhow!("innen").into();
        assert_eq!(e.to_string(), "innen");
    }
}

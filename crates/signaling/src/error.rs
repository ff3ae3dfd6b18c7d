//! Fehlertypen fuer den Signaling-Service
//!
//! Betrifft nur Transport und Protokoll. Registry, Handshake und
//! Broadcast sind fehlerfrei.

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Protokollfehler (ungueltiges Frame)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Senden an den Client fehlgeschlagen
    #[error("Senden fehlgeschlagen: {0}")]
    SendFehler(String),

    /// Keine Frames innerhalb des Keepalive-Fensters
    #[error("Timeout nach {0} ms ohne Lebenszeichen")]
    Timeout(u64),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Ordnet einen Lesefehler des Frame-Codecs ein
    ///
    /// `InvalidData` kommt aus dem Codec (kaputtes JSON, zu grosser Frame),
    /// alles andere ist ein echter IO-Fehler.
    pub fn aus_lesefehler(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::InvalidData {
            Self::Protokoll(e.to_string())
        } else {
            Self::Io(e)
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

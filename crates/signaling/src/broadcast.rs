//! Event-Broadcaster – Stellt benannte Ereignisse an Verbindungen zu
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller offenen
//! Verbindungen. `senden` stellt ein Ereignis an eine Liste von
//! Empfaengern zu.
//!
//! ## Zustellung
//! - jeder Empfaenger unabhaengig, nicht-blockierend (`try_send`)
//! - volle oder geschlossene Queue: Nachricht wird verworfen, die anderen
//!   Empfaenger sind davon nicht betroffen
//! - unbekannte Empfaenger werden stillschweigend uebersprungen
//! - keine Bestaetigung, kein Retry, keine Reihenfolge zwischen Empfaengern

use dashmap::DashMap;
use rollcall_core::types::ConnectionId;
use rollcall_protocol::control::ControlMessage;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Standard-Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.connection_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %self.connection_id, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Dispatcher fuer benannte Ereignisse
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Send-Queues, indiziert nach ConnectionId
    verbindungen: DashMap<ConnectionId, ClientSender>,
    /// Kapazitaet neuer Send-Queues
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt einen EventBroadcaster mit eigener Queue-Kapazitaet
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt auf den Socket.
    pub fn verbindung_registrieren(
        &self,
        connection_id: ConnectionId,
    ) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        let sender = ClientSender {
            connection_id: connection_id.clone(),
            tx,
        };
        self.inner.verbindungen.insert(connection_id.clone(), sender);
        tracing::debug!(connection_id = %connection_id, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt die Send-Queue einer Verbindung
    pub fn verbindung_entfernen(&self, connection_id: &ConnectionId) {
        if self.inner.verbindungen.remove(connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Verbindung aus Broadcaster entfernt");
        }
    }

    /// Stellt ein benanntes Ereignis an alle Empfaenger zu
    ///
    /// Gibt die Anzahl der erfolgreich eingereihten Nachrichten zurueck.
    /// Eine leere Empfaengerliste ist ein No-op.
    pub fn senden(
        &self,
        name: &str,
        empfaenger: &[ConnectionId],
        daten: Option<serde_json::Value>,
    ) -> usize {
        if empfaenger.is_empty() {
            return 0;
        }

        tracing::debug!(event = name, empfaenger = ?empfaenger, "Ereignis wird verteilt");

        let nachricht = ControlMessage::event(name, daten);
        let mut gesendet = 0;
        for connection_id in empfaenger {
            match self.inner.verbindungen.get(connection_id) {
                Some(sender) => {
                    if sender.senden(nachricht.clone()) {
                        gesendet += 1;
                    }
                }
                None => {
                    tracing::trace!(connection_id = %connection_id, event = name, "Empfaenger nicht verbunden – verworfen");
                }
            }
        }
        gesendet
    }

    /// Wie `senden`, serialisiert die Nutzdaten vorher
    pub fn senden_mit<T: Serialize>(
        &self,
        name: &str,
        empfaenger: &[ConnectionId],
        daten: &T,
    ) -> usize {
        match serde_json::to_value(daten) {
            Ok(wert) => self.senden(name, empfaenger, Some(wert)),
            Err(e) => {
                tracing::error!(event = name, fehler = %e, "Nutzdaten nicht serialisierbar");
                0
            }
        }
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn verbindung_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, connection_id: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(connection_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

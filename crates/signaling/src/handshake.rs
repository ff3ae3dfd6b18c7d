//! Handshake-Protokoll – Neue Sitzung oder Wiederverbindung?
//!
//! ## State Machine (pro Handshake)
//! ```text
//!                  +--> Wiederverbunden  (Verbindung bereits bekannt)
//! NeueVerbindung --+
//!                  +--> NeueSitzung      (neue Identitaet vergeben)
//! ```
//!
//! Beide Endzustaende sind terminal. Der Handshake wird nie abgelehnt.
//!
//! - `Wiederverbunden`: die Verbindung ist bereits als Wert in der Registry
//!   eingetragen. Antwort mit der bekannten Identitaet und allen
//!   Verbindungen, keine Aenderung, kein Broadcast.
//! - `NeueSitzung`: neue `UserId` (UUID v4) wird eingetragen. Antwort mit
//!   der neuen Identitaet und allen Verbindungen, danach `user_connected`
//!   an alle anderen Verbindungen.
//!
//! Suchen und Eintragen laufen atomar in der Registry, zwei gleichzeitige
//! Handshakes derselben Verbindung erzeugen daher nie zwei Identitaeten.

use rollcall_core::types::{ConnectionId, UserId};
use rollcall_protocol::control::ereignisse;

use crate::broadcast::EventBroadcaster;
use crate::registry::{SessionRegistry, Zuordnung};

/// Zustand eines Handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeZustand {
    /// Verbindung signalisiert, noch nicht verarbeitet
    NeueVerbindung,
    /// Verbindung war bereits einer Identitaet zugeordnet
    Wiederverbunden,
    /// Neue Identitaet vergeben
    NeueSitzung,
}

impl HandshakeZustand {
    /// Kurzname fuer Logs und Metrik-Labels
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::NeueVerbindung => "neue_verbindung",
            Self::Wiederverbunden => "wiederverbunden",
            Self::NeueSitzung => "neue_sitzung",
        }
    }
}

/// Ergebnis eines abgeschlossenen Handshakes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeErgebnis {
    /// Endzustand (`Wiederverbunden` oder `NeueSitzung`)
    pub zustand: HandshakeZustand,
    /// Identitaet des Clients
    pub user_id: UserId,
    /// Alle registrierten Verbindungen nach dem Handshake
    pub verbindungen: Vec<ConnectionId>,
}

/// Fuehrt Handshakes gegen eine Registry aus
#[derive(Clone)]
pub struct HandshakeProtokoll {
    registry: SessionRegistry,
    broadcaster: EventBroadcaster,
}

impl HandshakeProtokoll {
    /// Erstellt ein neues Handshake-Protokoll
    pub fn neu(registry: SessionRegistry, broadcaster: EventBroadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Verarbeitet den Handshake einer Verbindung
    pub fn verarbeiten(&self, connection_id: &ConnectionId) -> HandshakeErgebnis {
        tracing::trace!(
            connection_id = %connection_id,
            zustand = HandshakeZustand::NeueVerbindung.als_str(),
            "Handshake beginnt"
        );

        match self
            .registry
            .zuordnen_oder_registrieren(connection_id, UserId::new)
        {
            Zuordnung::Bekannt {
                user_id,
                verbindungen,
            } => {
                tracing::info!(
                    connection_id = %connection_id,
                    user_id = %user_id,
                    "Verbindung bereits bekannt – Wiederverbindung"
                );
                HandshakeErgebnis {
                    zustand: HandshakeZustand::Wiederverbunden,
                    user_id,
                    verbindungen,
                }
            }
            Zuordnung::Neu {
                user_id,
                verbindungen,
            } => {
                tracing::info!(
                    connection_id = %connection_id,
                    user_id = %user_id,
                    online = verbindungen.len(),
                    "Neue Sitzung registriert"
                );

                // user_connected landet in den Queues der anderen, bevor der
                // Aufrufer die Antwort schreibt. Ueber Verbindungsgrenzen
                // hinweg ist die Reihenfolge nicht beobachtbar.
                let andere: Vec<ConnectionId> = verbindungen
                    .iter()
                    .filter(|c| *c != connection_id)
                    .cloned()
                    .collect();
                self.broadcaster
                    .senden_mit(ereignisse::USER_CONNECTED, &andere, &verbindungen);

                HandshakeErgebnis {
                    zustand: HandshakeZustand::NeueSitzung,
                    user_id,
                    verbindungen,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_protocol::control::{ControlMessage, ControlPayload};
    use tokio::sync::mpsc;

    fn c(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    fn aufbau() -> (SessionRegistry, EventBroadcaster, HandshakeProtokoll) {
        let registry = SessionRegistry::neu();
        let broadcaster = EventBroadcaster::neu();
        let protokoll = HandshakeProtokoll::neu(registry.clone(), broadcaster.clone());
        (registry, broadcaster, protokoll)
    }

    fn user_connected_daten(rx: &mut mpsc::Receiver<ControlMessage>) -> Vec<ConnectionId> {
        let msg = rx.try_recv().expect("user_connected erwartet");
        match msg.payload {
            ControlPayload::Event(e) => {
                assert_eq!(e.name, ereignisse::USER_CONNECTED);
                e.daten_als().expect("Liste von ConnectionIds erwartet")
            }
            _ => panic!("Erwartet Event-Payload"),
        }
    }

    #[test]
    fn erster_handshake_ohne_broadcast() {
        let (registry, broadcaster, protokoll) = aufbau();
        let mut rx1 = broadcaster.verbindung_registrieren(c("C1"));

        let erg = protokoll.verarbeiten(&c("C1"));
        assert_eq!(erg.zustand, HandshakeZustand::NeueSitzung);
        assert_eq!(erg.verbindungen, vec![c("C1")]);
        assert_eq!(registry.lookup(&erg.user_id), Some(c("C1")));
        assert!(rx1.try_recv().is_err(), "Ausloeser bekommt kein user_connected");
    }

    #[test]
    fn zweiter_handshake_benachrichtigt_die_anderen() {
        let (_registry, broadcaster, protokoll) = aufbau();
        let mut rx1 = broadcaster.verbindung_registrieren(c("C1"));
        let mut rx2 = broadcaster.verbindung_registrieren(c("C2"));

        let u1 = protokoll.verarbeiten(&c("C1")).user_id;
        let erg = protokoll.verarbeiten(&c("C2"));

        assert_ne!(erg.user_id, u1);
        assert_eq!(erg.zustand, HandshakeZustand::NeueSitzung);
        assert_eq!(erg.verbindungen, vec![c("C1"), c("C2")]);
        // Bereits eingereiht, bevor die Antwort an C2 geht
        assert_eq!(user_connected_daten(&mut rx1), vec![c("C1"), c("C2")]);
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn wiederholter_handshake_ist_idempotent() {
        let (registry, broadcaster, protokoll) = aufbau();
        let mut rx1 = broadcaster.verbindung_registrieren(c("C1"));
        let _rx2 = broadcaster.verbindung_registrieren(c("C2"));

        protokoll.verarbeiten(&c("C1"));
        let erste = protokoll.verarbeiten(&c("C2"));
        let _ = rx1.try_recv();

        let zweite = protokoll.verarbeiten(&c("C2"));
        assert_eq!(zweite.zustand, HandshakeZustand::Wiederverbunden);
        assert_eq!(zweite.user_id, erste.user_id);
        assert_eq!(zweite.verbindungen, vec![c("C1"), c("C2")]);
        assert_eq!(registry.anzahl(), 2);
        assert!(rx1.try_recv().is_err(), "Wiederverbindung loest keinen Broadcast aus");
    }

    #[test]
    fn broadcast_geht_an_alle_ausser_neuer_verbindung() {
        let (_registry, broadcaster, protokoll) = aufbau();
        let mut receivers: Vec<_> = (1..=4)
            .map(|i| broadcaster.verbindung_registrieren(c(&format!("C{i}"))))
            .collect();

        for i in 1..=3 {
            protokoll.verarbeiten(&c(&format!("C{i}")));
        }
        for rx in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }

        protokoll.verarbeiten(&c("C4"));
        for rx in receivers.iter_mut().take(3) {
            assert_eq!(
                user_connected_daten(rx),
                vec![c("C1"), c("C2"), c("C3"), c("C4")]
            );
        }
        assert!(receivers[3].try_recv().is_err());
    }

    #[test]
    fn zustand_kurznamen() {
        assert_eq!(HandshakeZustand::NeueSitzung.als_str(), "neue_sitzung");
        assert_eq!(HandshakeZustand::Wiederverbunden.als_str(), "wiederverbunden");
        assert_eq!(HandshakeZustand::NeueVerbindung.als_str(), "neue_verbindung");
    }
}

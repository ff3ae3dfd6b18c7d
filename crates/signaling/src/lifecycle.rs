//! Lebenszyklus-Manager – Verbindet Transport-Signale mit dem Presence-Kern
//!
//! Pro Verbindung:
//! - `verbunden`  – Send-Queue beim Broadcaster anlegen
//! - `handshake`  – Handshake-Protokoll ausfuehren, Ergebnis an den Aufrufer
//! - `getrennt`   – Identitaet entfernen, `user_disconnected` an alle uebrigen
//!
//! Jede Mitgliedschaftsaenderung wird zusaetzlich als `PresenceEvent` auf
//! einem Broadcast-Kanal veroeffentlicht (Metriken, Logging).

use rollcall_core::event::PresenceEvent;
use rollcall_core::types::{ConnectionId, UserId};
use rollcall_protocol::control::{ereignisse, ControlMessage};
use tokio::sync::{broadcast, mpsc};

use crate::broadcast::EventBroadcaster;
use crate::handshake::{HandshakeErgebnis, HandshakeProtokoll, HandshakeZustand};
use crate::registry::SessionRegistry;

/// Groesse des Broadcast-Kanals fuer Presence-Events
const EVENT_KANAL_GROESSE: usize = 256;

/// Verdrahtet Connect/Handshake/Disconnect einer Verbindung
///
/// Clone teilt Registry, Broadcaster und Event-Kanal.
#[derive(Clone)]
pub struct LifecycleManager {
    registry: SessionRegistry,
    broadcaster: EventBroadcaster,
    handshake: HandshakeProtokoll,
    event_tx: broadcast::Sender<PresenceEvent>,
}

impl LifecycleManager {
    /// Erstellt einen neuen Manager ueber der gegebenen Registry
    pub fn neu(registry: SessionRegistry, broadcaster: EventBroadcaster) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        let handshake = HandshakeProtokoll::neu(registry.clone(), broadcaster.clone());
        Self {
            registry,
            broadcaster,
            handshake,
            event_tx,
        }
    }

    /// Neue Transport-Verbindung: Send-Queue anlegen
    pub fn verbunden(&self, connection_id: &ConnectionId) -> mpsc::Receiver<ControlMessage> {
        tracing::info!(connection_id = %connection_id, "Verbindung eingegangen");
        self.broadcaster.verbindung_registrieren(connection_id.clone())
    }

    /// Handshake-Anfrage einer Verbindung
    pub fn handshake(&self, connection_id: &ConnectionId) -> HandshakeErgebnis {
        tracing::debug!(connection_id = %connection_id, "Handshake empfangen");
        let ergebnis = self.handshake.verarbeiten(connection_id);

        let event = match ergebnis.zustand {
            HandshakeZustand::NeueSitzung => PresenceEvent::SitzungErstellt {
                user_id: ergebnis.user_id,
                connection_id: connection_id.clone(),
                online: ergebnis.verbindungen.len(),
            },
            _ => PresenceEvent::SitzungWiederhergestellt {
                user_id: ergebnis.user_id,
                connection_id: connection_id.clone(),
            },
        };
        let _ = self.event_tx.send(event);

        ergebnis
    }

    /// Verbindung getrennt: aufraeumen und verbleibende benachrichtigen
    ///
    /// Gibt die entfernte Identitaet zurueck. War die Verbindung nie
    /// registriert (oder ist bereits aufgeraeumt), passiert nichts.
    pub fn getrennt(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.broadcaster.verbindung_entfernen(connection_id);

        let Some(entfernt) = self.registry.verbindung_entfernen(connection_id) else {
            tracing::debug!(connection_id = %connection_id, "Trennen ohne Handshake – nichts zu tun");
            return None;
        };

        tracing::info!(
            connection_id = %connection_id,
            user_id = %entfernt.user_id,
            online = entfernt.verbleibend.len(),
            "Sitzung beendet"
        );

        self.broadcaster.senden_mit(
            ereignisse::USER_DISCONNECTED,
            &entfernt.verbleibend,
            &entfernt.user_id,
        );

        let _ = self.event_tx.send(PresenceEvent::SitzungBeendet {
            user_id: entfernt.user_id,
            connection_id: connection_id.clone(),
            online: entfernt.verbleibend.len(),
        });

        Some(entfernt.user_id)
    }

    /// Abonniert Presence-Events
    pub fn events_abonnieren(&self) -> broadcast::Receiver<PresenceEvent> {
        self.event_tx.subscribe()
    }

    /// Zugriff auf die Registry (nur lesend gedacht)
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Anzahl der Online-Sitzungen
    pub fn online_anzahl(&self) -> usize {
        self.registry.anzahl()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_protocol::control::ControlPayload;

    fn c(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    fn manager() -> LifecycleManager {
        LifecycleManager::neu(SessionRegistry::neu(), EventBroadcaster::neu())
    }

    fn naechstes_ereignis(rx: &mut mpsc::Receiver<ControlMessage>) -> (String, serde_json::Value) {
        let msg = rx.try_recv().expect("Ereignis erwartet");
        match msg.payload {
            ControlPayload::Event(e) => (e.name, e.data.unwrap_or(serde_json::Value::Null)),
            _ => panic!("Erwartet Event-Payload"),
        }
    }

    #[test]
    fn szenario_zwei_clients_einer_geht() {
        let lm = manager();
        let mut rx1 = lm.verbunden(&c("C1"));
        let u1 = lm.handshake(&c("C1"));
        assert_eq!(u1.verbindungen, vec![c("C1")]);
        assert!(rx1.try_recv().is_err());

        let mut rx2 = lm.verbunden(&c("C2"));
        let u2 = lm.handshake(&c("C2"));
        assert_eq!(u2.verbindungen, vec![c("C1"), c("C2")]);

        let (name, daten) = naechstes_ereignis(&mut rx1);
        assert_eq!(name, "user_connected");
        assert_eq!(daten, serde_json::json!(["C1", "C2"]));
        assert!(rx2.try_recv().is_err());

        assert_eq!(lm.getrennt(&c("C1")), Some(u1.user_id));
        let (name, daten) = naechstes_ereignis(&mut rx2);
        assert_eq!(name, "user_disconnected");
        assert_eq!(daten, serde_json::json!(u1.user_id.to_string()));
        assert_eq!(lm.registry().lookup(&u1.user_id), None);
        assert_eq!(lm.online_anzahl(), 1);
    }

    #[test]
    fn doppeltes_trennen_ohne_zweiten_broadcast() {
        let lm = manager();
        let _rx1 = lm.verbunden(&c("C1"));
        let mut rx2 = lm.verbunden(&c("C2"));
        lm.handshake(&c("C1"));
        lm.handshake(&c("C2"));

        assert!(lm.getrennt(&c("C1")).is_some());
        assert!(rx2.try_recv().is_ok());

        assert_eq!(lm.getrennt(&c("C1")), None);
        assert!(rx2.try_recv().is_err(), "Kein zweiter user_disconnected");
    }

    #[test]
    fn trennen_ohne_handshake_tut_nichts() {
        let lm = manager();
        let _rx1 = lm.verbunden(&c("C1"));
        let mut rx2 = lm.verbunden(&c("C2"));
        lm.handshake(&c("C2"));

        assert_eq!(lm.getrennt(&c("C1")), None);
        assert!(rx2.try_recv().is_err());
        assert_eq!(lm.online_anzahl(), 1);
    }

    #[test]
    fn registry_groesse_entspricht_offenen_sitzungen() {
        let lm = manager();
        let _queues: Vec<_> = (0..5).map(|i| lm.verbunden(&c(&format!("C{i}")))).collect();
        for i in 0..5 {
            lm.handshake(&c(&format!("C{i}")));
        }
        assert_eq!(lm.online_anzahl(), 5);

        lm.getrennt(&c("C0"));
        lm.getrennt(&c("C3"));
        assert_eq!(lm.online_anzahl(), 3);
        assert_eq!(lm.registry().snapshot(), vec![c("C1"), c("C2"), c("C4")]);
    }

    #[tokio::test]
    async fn presence_events_werden_veroeffentlicht() {
        let lm = manager();
        let mut events = lm.events_abonnieren();
        let _rx = lm.verbunden(&c("C1"));

        let erg = lm.handshake(&c("C1"));
        lm.handshake(&c("C1"));
        lm.getrennt(&c("C1"));

        assert_eq!(
            events.recv().await.unwrap(),
            PresenceEvent::SitzungErstellt {
                user_id: erg.user_id,
                connection_id: c("C1"),
                online: 1,
            }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            PresenceEvent::SitzungWiederhergestellt { .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            PresenceEvent::SitzungBeendet {
                user_id: erg.user_id,
                connection_id: c("C1"),
                online: 0,
            }
        );
    }
}

//! Session-Registry – Wer ist online, ueber welche Verbindung?
//!
//! Einzige Quelle der Wahrheit fuer die Zuordnung
//! logische Identitaet (`UserId`) -> aktuelle Verbindung (`ConnectionId`).
//!
//! ## Invarianten
//! - jede `UserId` kommt hoechstens einmal vor
//! - jede `ConnectionId` gehoert hoechstens zu einer `UserId`
//!   (Rueckwaerts-Suche per linearem Scan ueber die Werte)
//!
//! ## Atomaritaet
//! Alle Operationen laufen unter einem einzigen Mutex. Zusammengesetzte
//! Ablaeufe (Handshake: Suchen + Eintragen, Trennen: Suchen + Entfernen +
//! Snapshot) gibt es als eigene Methoden, damit sie nicht zwischen zwei
//! Lock-Phasen auseinanderfallen koennen.

use parking_lot::Mutex;
use rollcall_core::types::{ConnectionId, UserId};
use std::sync::Arc;

/// Ein Registry-Eintrag
#[derive(Debug, Clone)]
struct Eintrag {
    user_id: UserId,
    connection_id: ConnectionId,
}

/// Ergebnis von [`SessionRegistry::zuordnen_oder_registrieren`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Zuordnung {
    /// Verbindung war bereits einer Identitaet zugeordnet, nichts geaendert
    Bekannt {
        user_id: UserId,
        verbindungen: Vec<ConnectionId>,
    },
    /// Neue Identitaet wurde eingetragen
    Neu {
        user_id: UserId,
        verbindungen: Vec<ConnectionId>,
    },
}

/// Ergebnis von [`SessionRegistry::verbindung_entfernen`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entfernt {
    /// Identitaet die der Verbindung zugeordnet war
    pub user_id: UserId,
    /// Alle danach noch registrierten Verbindungen
    pub verbleibend: Vec<ConnectionId>,
}

/// Zuordnung Identitaet -> Verbindung (thread-safe)
///
/// Clone teilt den inneren Zustand. Jede Instanz ist unabhaengig, es gibt
/// keinen globalen Zustand.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    eintraege: Arc<Mutex<Vec<Eintrag>>>,
}

impl SessionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Aktuelle Verbindung einer Identitaet
    pub fn lookup(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.eintraege
            .lock()
            .iter()
            .find(|e| e.user_id == *user_id)
            .map(|e| e.connection_id.clone())
    }

    /// Identitaet zu einer Verbindung (linearer Scan ueber die Werte)
    pub fn reverse_lookup(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let eintraege = self.eintraege.lock();
        suchen(&eintraege, connection_id)
    }

    /// Traegt eine Zuordnung ein oder ueberschreibt sie
    ///
    /// Haelt bereits eine andere Identitaet dieselbe Verbindung, wird deren
    /// Eintrag verworfen: eine Verbindung vertritt nie zwei Identitaeten.
    pub fn put(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut eintraege = self.eintraege.lock();
        eintragen(&mut eintraege, user_id, connection_id);
    }

    /// Entfernt eine Identitaet; No-op falls unbekannt
    ///
    /// Gibt die bisherige Verbindung zurueck.
    pub fn remove(&self, user_id: &UserId) -> Option<ConnectionId> {
        let mut eintraege = self.eintraege.lock();
        let pos = eintraege.iter().position(|e| e.user_id == *user_id)?;
        Some(eintraege.remove(pos).connection_id)
    }

    /// Alle registrierten Verbindungen in Registry-Reihenfolge
    pub fn snapshot(&self) -> Vec<ConnectionId> {
        verbindungen(&self.eintraege.lock())
    }

    /// Anzahl der registrierten Identitaeten
    pub fn anzahl(&self) -> usize {
        self.eintraege.lock().len()
    }

    /// Prueft ob die Registry leer ist
    pub fn ist_leer(&self) -> bool {
        self.eintraege.lock().is_empty()
    }

    /// Rueckwaerts-Suche und ggf. Eintragen als eine atomare Einheit
    ///
    /// `neue_identitaet` wird nur aufgerufen wenn die Verbindung noch
    /// keiner Identitaet gehoert.
    pub fn zuordnen_oder_registrieren(
        &self,
        connection_id: &ConnectionId,
        neue_identitaet: impl FnOnce() -> UserId,
    ) -> Zuordnung {
        let mut eintraege = self.eintraege.lock();

        if let Some(user_id) = suchen(&eintraege, connection_id) {
            return Zuordnung::Bekannt {
                user_id,
                verbindungen: verbindungen(&eintraege),
            };
        }

        let user_id = neue_identitaet();
        eintragen(&mut eintraege, user_id, connection_id.clone());
        Zuordnung::Neu {
            user_id,
            verbindungen: verbindungen(&eintraege),
        }
    }

    /// Rueckwaerts-Suche, Entfernen und Snapshot als eine atomare Einheit
    ///
    /// Gibt `None` zurueck wenn die Verbindung nie registriert war oder
    /// bereits entfernt wurde.
    pub fn verbindung_entfernen(&self, connection_id: &ConnectionId) -> Option<Entfernt> {
        let mut eintraege = self.eintraege.lock();
        let pos = eintraege
            .iter()
            .position(|e| e.connection_id == *connection_id)?;
        let eintrag = eintraege.remove(pos);

        Some(Entfernt {
            user_id: eintrag.user_id,
            verbleibend: verbindungen(&eintraege),
        })
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen (nur mit gehaltenem Lock aufrufen)
// ---------------------------------------------------------------------------

fn suchen(eintraege: &[Eintrag], connection_id: &ConnectionId) -> Option<UserId> {
    eintraege
        .iter()
        .find(|e| e.connection_id == *connection_id)
        .map(|e| e.user_id)
}

fn verbindungen(eintraege: &[Eintrag]) -> Vec<ConnectionId> {
    eintraege.iter().map(|e| e.connection_id.clone()).collect()
}

fn eintragen(eintraege: &mut Vec<Eintrag>, user_id: UserId, connection_id: ConnectionId) {
    eintraege.retain(|e| {
        let fremd = e.connection_id == connection_id && e.user_id != user_id;
        if fremd {
            tracing::debug!(
                user_id = %e.user_id,
                connection_id = %connection_id,
                "Veralteter Eintrag fuer Verbindung verworfen"
            );
        }
        !fremd
    });

    match eintraege.iter_mut().find(|e| e.user_id == user_id) {
        Some(e) => e.connection_id = connection_id,
        None => eintraege.push(Eintrag {
            user_id,
            connection_id,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    #[test]
    fn put_und_lookup() {
        let reg = SessionRegistry::neu();
        let uid = UserId::new();

        assert_eq!(reg.lookup(&uid), None);
        reg.put(uid, c("C1"));
        assert_eq!(reg.lookup(&uid), Some(c("C1")));
        assert_eq!(reg.reverse_lookup(&c("C1")), Some(uid));
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn put_ueberschreibt_wert_an_gleicher_stelle() {
        let reg = SessionRegistry::neu();
        let u1 = UserId::new();
        let u2 = UserId::new();

        reg.put(u1, c("C1"));
        reg.put(u2, c("C2"));
        reg.put(u1, c("C3"));

        assert_eq!(reg.snapshot(), vec![c("C3"), c("C2")]);
        assert_eq!(reg.reverse_lookup(&c("C1")), None);
        assert_eq!(reg.anzahl(), 2);
    }

    #[test]
    fn put_ist_idempotent() {
        let reg = SessionRegistry::neu();
        let uid = UserId::new();
        reg.put(uid, c("C1"));
        reg.put(uid, c("C1"));
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn verbindung_gehoert_hoechstens_einer_identitaet() {
        let reg = SessionRegistry::neu();
        let alt = UserId::new();
        let neu = UserId::new();

        reg.put(alt, c("C1"));
        reg.put(neu, c("C1"));

        assert_eq!(reg.reverse_lookup(&c("C1")), Some(neu));
        assert_eq!(reg.lookup(&alt), None);
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn remove_ist_noop_fuer_unbekannte() {
        let reg = SessionRegistry::neu();
        let uid = UserId::new();
        reg.put(uid, c("C1"));

        assert_eq!(reg.remove(&uid), Some(c("C1")));
        assert_eq!(reg.remove(&uid), None);
        assert!(reg.ist_leer());
    }

    #[test]
    fn snapshot_in_registry_reihenfolge() {
        let reg = SessionRegistry::neu();
        let ids: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        for (i, uid) in ids.iter().enumerate() {
            reg.put(*uid, c(&format!("C{}", i + 1)));
        }
        reg.remove(&ids[1]);

        assert_eq!(reg.snapshot(), vec![c("C1"), c("C3"), c("C4")]);
    }

    #[test]
    fn zuordnen_vergibt_nur_einmal() {
        let reg = SessionRegistry::neu();

        let erste = reg.zuordnen_oder_registrieren(&c("C1"), UserId::new);
        let uid = match erste {
            Zuordnung::Neu {
                user_id,
                ref verbindungen,
            } => {
                assert_eq!(verbindungen, &vec![c("C1")]);
                user_id
            }
            Zuordnung::Bekannt { .. } => panic!("Erwartet neue Zuordnung"),
        };

        let zweite = reg.zuordnen_oder_registrieren(&c("C1"), || {
            panic!("Darf keine zweite Identitaet erzeugen")
        });
        assert_eq!(
            zweite,
            Zuordnung::Bekannt {
                user_id: uid,
                verbindungen: vec![c("C1")],
            }
        );
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn verbindung_entfernen_liefert_verbleibende() {
        let reg = SessionRegistry::neu();
        let u1 = UserId::new();
        let u2 = UserId::new();
        reg.put(u1, c("C1"));
        reg.put(u2, c("C2"));

        let entfernt = reg.verbindung_entfernen(&c("C1")).expect("C1 registriert");
        assert_eq!(entfernt.user_id, u1);
        assert_eq!(entfernt.verbleibend, vec![c("C2")]);
        assert_eq!(reg.lookup(&u1), None);

        assert!(reg.verbindung_entfernen(&c("C1")).is_none());
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let reg1 = SessionRegistry::neu();
        let reg2 = reg1.clone();
        let uid = UserId::new();

        reg1.put(uid, c("C1"));
        assert_eq!(reg2.lookup(&uid), Some(c("C1")));
    }

    #[test]
    fn getrennte_instanzen_sind_isoliert() {
        let reg1 = SessionRegistry::neu();
        let reg2 = SessionRegistry::neu();
        reg1.put(UserId::new(), c("C1"));
        assert!(reg2.ist_leer());
    }

    #[test]
    fn parallele_handshakes_fuer_dieselbe_verbindung() {
        let reg = SessionRegistry::neu();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    match reg.zuordnen_oder_registrieren(&c("C1"), UserId::new) {
                        Zuordnung::Neu { user_id, .. } | Zuordnung::Bekannt { user_id, .. } => {
                            user_id
                        }
                    }
                })
            })
            .collect();

        let ids: Vec<UserId> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread darf nicht paniken"))
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]), "Genau eine Identitaet erwartet");
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn verschiedene_verbindungen_verschiedene_identitaeten() {
        let reg = SessionRegistry::neu();
        let mut ids = Vec::new();
        for i in 0..10 {
            if let Zuordnung::Neu { user_id, .. } =
                reg.zuordnen_oder_registrieren(&c(&format!("C{i}")), UserId::new)
            {
                ids.push(user_id);
            }
        }
        ids.sort_by_key(|u| u.inner());
        ids.dedup();
        assert_eq!(ids.len(), 10);
        assert_eq!(reg.anzahl(), 10);
    }
}

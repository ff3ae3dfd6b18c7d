//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Broadcaster und Lebenszyklus-Manager zusammen. Wird
//! einmal beim Start erzeugt und als `Arc` an alle Verbindungs-Tasks
//! weitergereicht.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rollcall_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::lifecycle::LifecycleManager;
use crate::registry::SessionRegistry;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Anzahl gleichzeitig offener Verbindungen
    pub max_clients: u32,
    /// Intervall zwischen Keepalive-Pings in Millisekunden
    pub keepalive_ms: u64,
    /// Wartezeit auf ein Lebenszeichen nach einem Ping in Millisekunden
    pub ping_timeout_ms: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_bytes: usize,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
}

impl SignalingConfig {
    /// Keepalive-Intervall
    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }

    /// Maximale Stille bevor eine Verbindung als tot gilt
    pub fn verbindungs_timeout(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms + self.ping_timeout_ms)
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_ms: 10_000,
            ping_timeout_ms: 5_000,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
            send_queue_groesse: SEND_QUEUE_GROESSE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Session-Registry (Identitaet -> Verbindung)
    pub registry: SessionRegistry,
    /// Event-Broadcaster (Send-Queues aller Verbindungen)
    pub broadcaster: EventBroadcaster,
    /// Lebenszyklus-Manager (Connect, Handshake, Disconnect)
    pub lifecycle: LifecycleManager,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState mit leerer Registry
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let registry = SessionRegistry::neu();
        let broadcaster = EventBroadcaster::mit_queue_groesse(config.send_queue_groesse);
        let lifecycle = LifecycleManager::neu(registry.clone(), broadcaster.clone());

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            broadcaster,
            lifecycle,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

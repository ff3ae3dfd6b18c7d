//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use rollcall_core::RollcallError;
use rollcall_observability::LogKonfiguration;
use rollcall_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use rollcall_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Keepalive und Frame-Limits
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LogKonfiguration,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Rollcall Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer TCP und Observability
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9987,
        }
    }
}

/// Keepalive und Frame-Limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Intervall zwischen Keepalive-Pings in Millisekunden
    pub keepalive_ms: u64,
    /// Zusaetzliche Wartezeit auf ein Lebenszeichen in Millisekunden
    pub ping_timeout_ms: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_bytes: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_ms: 10_000,
            ping_timeout_ms: 5_000,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft die Werte auf Plausibilitaet
    pub fn validieren(&self) -> rollcall_core::Result<()> {
        if self.server.max_clients == 0 {
            return Err(RollcallError::konfiguration(
                "server.max_clients muss groesser als 0 sein",
            ));
        }
        if self.signaling.keepalive_ms == 0 {
            return Err(RollcallError::konfiguration(
                "signaling.keepalive_ms muss groesser als 0 sein",
            ));
        }
        if self.signaling.max_frame_bytes < 64 {
            return Err(RollcallError::konfiguration(format!(
                "signaling.max_frame_bytes zu klein: {}",
                self.signaling.max_frame_bytes
            )));
        }
        if let Err(e) = self.logging.filter() {
            return Err(RollcallError::konfiguration(format!("logging.level: {e:#}")));
        }
        if self.observability.aktiviert && self.observability.port == self.netzwerk.tcp_port {
            return Err(RollcallError::konfiguration(
                "observability.port und netzwerk.tcp_port muessen sich unterscheiden",
            ));
        }
        Ok(())
    }

    /// Baut die Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_clients: self.server.max_clients,
            keepalive_ms: self.signaling.keepalive_ms,
            ping_timeout_ms: self.signaling.ping_timeout_ms,
            max_frame_bytes: self.signaling.max_frame_bytes,
            ..SignalingConfig::default()
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }
}

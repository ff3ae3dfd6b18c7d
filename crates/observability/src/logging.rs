//! Structured Logging Setup via tracing-subscriber
//!
//! Level und Format stehen im `[logging]`-Abschnitt der Konfiguration.
//! `RC_LOG_LEVEL` und `RC_LOG_FORMAT` ueberschreiben sie beim Start.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Level
pub const LOG_LEVEL_ENV: &str = "RC_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const LOG_FORMAT_ENV: &str = "RC_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(anyhow!("Unbekanntes Log-Format '{anderes}'")),
        }
    }
}

/// Logging-Einstellungen, direkt als `[logging]` deserialisierbar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogKonfiguration {
    /// Log-Level oder EnvFilter-Direktive, z.B. "info" oder "rollcall_signaling=debug"
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogKonfiguration {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl LogKonfiguration {
    /// Wendet `RC_LOG_LEVEL` / `RC_LOG_FORMAT` an, falls gesetzt
    pub fn aus_umgebung(&self) -> Result<Self> {
        self.ueberschreiben(
            std::env::var(LOG_LEVEL_ENV).ok(),
            std::env::var(LOG_FORMAT_ENV).ok(),
        )
    }

    /// Ersetzt Level und Format durch die gegebenen Werte
    pub fn ueberschreiben(&self, level: Option<String>, format: Option<String>) -> Result<Self> {
        let mut neu = self.clone();
        if let Some(level) = level {
            neu.level = level;
        }
        if let Some(format) = format {
            neu.format = format
                .parse()
                .with_context(|| format!("{LOG_FORMAT_ENV} ungueltig"))?;
        }
        Ok(neu)
    }

    /// Baut den EnvFilter aus dem Level
    pub fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.level)
            .with_context(|| format!("Ungueltiger Log-Level '{}'", self.level))
    }
}

/// Initialisiert das Logging-System
///
/// Schlaegt fehl bei ungueltigem Level oder wenn bereits ein globaler
/// Subscriber gesetzt ist.
pub fn logging_initialisieren(konfig: &LogKonfiguration) -> Result<()> {
    let filter = konfig.filter()?;

    let ergebnis = match konfig.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

//! Prometheus-kompatible Metriken fuer Rollcall
//!
//! Registrierte Metriken:
//! - `rollcall_connected_sessions` – Gauge: Aktuell registrierte Sitzungen
//! - `rollcall_handshakes_total` – Counter: Handshakes (ergebnis)
//! - `rollcall_disconnects_total` – Counter: Beendete Sitzungen
//!
//! Die Counter kommen aus `PresenceEvent`s. Die Gauge wird direkt aus der
//! Registry-Groesse gesetzt und bleibt so auch nach verpassten Events korrekt.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use rollcall_core::PresenceEvent;
use std::sync::Arc;

/// Label-Wert fuer eine neue Sitzung
pub const ERGEBNIS_NEUE_SITZUNG: &str = "neue_sitzung";
/// Label-Wert fuer eine Wiederverbindung
pub const ERGEBNIS_WIEDERVERBUNDEN: &str = "wiederverbunden";

/// Alle Rollcall-Prometheus-Metriken
#[derive(Clone)]
pub struct RollcallMetrics {
    pub registry: Arc<Registry>,

    pub connected_sessions: Gauge,
    pub handshakes_total: IntCounterVec,
    pub disconnects_total: IntCounter,
}

impl RollcallMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_sessions = Gauge::with_opts(Opts::new(
            "rollcall_connected_sessions",
            "Anzahl aktuell registrierter Sitzungen",
        ))?;
        registry.register(Box::new(connected_sessions.clone()))?;

        let handshakes_total = IntCounterVec::new(
            Opts::new("rollcall_handshakes_total", "Abgeschlossene Handshakes"),
            &["ergebnis"],
        )?;
        registry.register(Box::new(handshakes_total.clone()))?;

        let disconnects_total = IntCounter::with_opts(Opts::new(
            "rollcall_disconnects_total",
            "Beendete Sitzungen",
        ))?;
        registry.register(Box::new(disconnects_total.clone()))?;

        // Label-Reihen vorbelegen, damit sie vor dem ersten Handshake sichtbar sind
        for ergebnis in [ERGEBNIS_NEUE_SITZUNG, ERGEBNIS_WIEDERVERBUNDEN] {
            handshakes_total.with_label_values(&[ergebnis]);
        }

        Ok(Self {
            registry: Arc::new(registry),
            connected_sessions,
            handshakes_total,
            disconnects_total,
        })
    }

    /// Verbucht ein Presence-Event in den Countern
    pub fn ereignis_verbuchen(&self, event: &PresenceEvent) {
        match event {
            PresenceEvent::SitzungErstellt { .. } => {
                self.handshakes_total
                    .with_label_values(&[ERGEBNIS_NEUE_SITZUNG])
                    .inc();
            }
            PresenceEvent::SitzungWiederhergestellt { .. } => {
                self.handshakes_total
                    .with_label_values(&[ERGEBNIS_WIEDERVERBUNDEN])
                    .inc();
            }
            PresenceEvent::SitzungBeendet { .. } => {
                self.disconnects_total.inc();
            }
        }
    }

    /// Setzt die Anzahl registrierter Sitzungen
    pub fn sitzungen_setzen(&self, anzahl: usize) {
        self.connected_sessions.set(anzahl as f64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RollcallMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RollcallMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{ConnectionId, UserId};

    fn erstellt(online: usize) -> PresenceEvent {
        PresenceEvent::SitzungErstellt {
            user_id: UserId::new(),
            connection_id: ConnectionId::new(),
            online,
        }
    }

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = RollcallMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
        assert_eq!(metriken.connected_sessions.get(), 0.0);
    }

    #[test]
    fn sitzungen_werden_gezaehlt() {
        let metriken = RollcallMetrics::neu().unwrap();
        metriken.ereignis_verbuchen(&erstellt(1));
        metriken.ereignis_verbuchen(&erstellt(2));
        metriken.ereignis_verbuchen(&PresenceEvent::SitzungWiederhergestellt {
            user_id: UserId::new(),
            connection_id: ConnectionId::new(),
        });
        metriken.ereignis_verbuchen(&PresenceEvent::SitzungBeendet {
            user_id: UserId::new(),
            connection_id: ConnectionId::new(),
            online: 1,
        });

        // Events allein bewegen die Gauge nicht
        assert_eq!(metriken.connected_sessions.get(), 0.0);
        metriken.sitzungen_setzen(1);
        assert_eq!(metriken.connected_sessions.get(), 1.0);
        assert_eq!(
            metriken
                .handshakes_total
                .with_label_values(&[ERGEBNIS_NEUE_SITZUNG])
                .get(),
            2
        );
        assert_eq!(
            metriken
                .handshakes_total
                .with_label_values(&[ERGEBNIS_WIEDERVERBUNDEN])
                .get(),
            1
        );
        assert_eq!(metriken.disconnects_total.get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = RollcallMetrics::neu().unwrap();
        metriken.ereignis_verbuchen(&erstellt(3));
        metriken.sitzungen_setzen(3);

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("rollcall_connected_sessions 3"));
        assert!(output.contains("rollcall_handshakes_total{ergebnis=\"neue_sitzung\"} 1"));
        assert!(output.contains("rollcall_handshakes_total{ergebnis=\"wiederverbunden\"} 0"));
        assert!(output.contains("rollcall_disconnects_total 0"));
        assert!(output.contains("# HELP"));
    }

    #[tokio::test]
    async fn metrics_endpunkt_liefert_text() {
        use tower::ServiceExt;

        let metriken = RollcallMetrics::neu().unwrap();
        metriken.ereignis_verbuchen(&erstellt(1));
        metriken.sitzungen_setzen(1);

        let antwort = metrics_router(metriken)
            .oneshot(
                axum::http::Request::get("/metrics")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("rollcall_connected_sessions 1"));
    }
}

//! Health-Check-Endpunkt fuer Rollcall
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl Online-Sitzungen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub online_sessions: usize,
}

type OnlineQuelle = Arc<dyn Fn() -> usize + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    beendet: Arc<AtomicBool>,
    online: OnlineQuelle,
}

impl HealthState {
    /// `online` liefert die aktuelle Anzahl registrierter Sitzungen
    pub fn neu(online: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            beendet: Arc::new(AtomicBool::new(false)),
            online: Arc::new(online),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn online_sessions(&self) -> usize {
        (self.online)()
    }

    /// Markiert den Server als herunterfahrend, `/health` antwortet dann 503
    pub fn beenden_markieren(&self) {
        self.beendet.store(true, Ordering::Relaxed);
    }

    pub fn wird_beendet(&self) -> bool {
        self.beendet.load(Ordering::Relaxed)
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (status, http_status) = if state.wird_beendet() {
        (HealthStatus::Unhealthy, StatusCode::SERVICE_UNAVAILABLE)
    } else {
        (HealthStatus::Healthy, StatusCode::OK)
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        online_sessions: state.online_sessions(),
    };

    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tower::ServiceExt;

    async fn abfragen(state: HealthState) -> (StatusCode, HealthResponse) {
        let antwort = health_router(state)
            .oneshot(
                axum::http::Request::get("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = antwort.status();
        let body = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn health_state_frisch() {
        let state = HealthState::neu(|| 0);
        assert!(state.uptime_seconds() < 5);
        assert!(!state.wird_beendet());
    }

    #[test]
    fn online_quelle_wird_live_gelesen() {
        let zaehler = Arc::new(AtomicUsize::new(2));
        let quelle = Arc::clone(&zaehler);
        let state = HealthState::neu(move || quelle.load(Ordering::Relaxed));

        assert_eq!(state.online_sessions(), 2);
        zaehler.store(5, Ordering::Relaxed);
        assert_eq!(state.online_sessions(), 5);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            online_sessions: 7,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"online_sessions\":7"));
    }

    #[tokio::test]
    async fn endpunkt_meldet_online_sitzungen() {
        let (status, antwort) = abfragen(HealthState::neu(|| 3)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.online_sessions, 3);
    }

    #[tokio::test]
    async fn endpunkt_beim_herunterfahren_503() {
        let state = HealthState::neu(|| 0);
        state.beenden_markieren();
        let (status, antwort) = abfragen(state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(antwort.status, HealthStatus::Unhealthy);
    }
}

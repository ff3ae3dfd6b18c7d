//! rollcall-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und verdrahtet Signaling-Service und
//! Observability zu einem lauffaehigen Server.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use rollcall_core::PresenceEvent;
use rollcall_observability::{observability_server_starten, HealthState, RollcallMetrics};
use rollcall_signaling::{SessionRegistry, SignalingServer, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.laufen_bis(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C Handler konnte nicht installiert werden");
            }
        })
        .await
    }

    /// Startet alle Server-Subsysteme und laeuft bis `signal` fertig ist
    ///
    /// Reihenfolge:
    /// 1. Konfiguration pruefen
    /// 2. Signaling-Zustand und Metriken anlegen
    /// 3. Presence-Events an die Metriken anbinden
    /// 4. Observability-Server starten (falls aktiviert)
    /// 5. TCP-Listener starten
    /// 6. Auf das Shutdown-Signal warten, dann alle Tasks beenden
    pub async fn laufen_bis(self, signal: impl Future<Output = ()>) -> Result<()> {
        self.config.validieren()?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let state = SignalingState::neu(self.config.signaling_config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let metriken = RollcallMetrics::neu()?;
        let bruecke = presence_bruecke_starten(
            state.lifecycle.events_abonnieren(),
            metriken.clone(),
            state.registry.clone(),
        );

        let registry = state.registry.clone();
        let health = HealthState::neu(move || registry.anzahl());

        let observability = if self.config.observability.aktiviert {
            let addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            let rx = shutdown_rx.clone();
            let m = metriken.clone();
            let h = health.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(addr, m, h, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        let tcp_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .context("Ungueltige TCP-Adresse")?;
        let listener = TcpListener::bind(tcp_addr)
            .await
            .with_context(|| format!("TCP-Port {tcp_addr} konnte nicht gebunden werden"))?;
        let signaling = SignalingServer::neu(Arc::clone(&state), tcp_addr);
        let tcp_task = tokio::spawn(signaling.starten_mit_listener(listener, shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        signal.await;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        health.beenden_markieren();
        // Empfaenger koennen bereits weg sein, wenn ein Task vorher beendet wurde
        let _ = shutdown_tx.send(true);

        tcp_task.await??;
        if let Some(task) = observability {
            task.await?;
        }
        bruecke.abort();

        tracing::info!(
            online = state.lifecycle.online_anzahl(),
            uptime_sek = state.uptime_sek(),
            "Server gestoppt"
        );
        Ok(())
    }
}

/// Leitet Presence-Events an die Metriken weiter
///
/// Nach jedem Event wird die Sitzungs-Gauge aus der Registry gesetzt.
/// Laeuft bis der Event-Kanal geschlossen wird.
pub fn presence_bruecke_starten(
    mut events: broadcast::Receiver<PresenceEvent>,
    metriken: RollcallMetrics,
    registry: SessionRegistry,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(user_id = %event.user_id(), online = ?event.online(), "Presence-Event verbucht");
                    metriken.ereignis_verbuchen(&event);
                    metriken.sitzungen_setzen(registry.anzahl());
                }
                Err(broadcast::error::RecvError::Lagged(verpasst)) => {
                    tracing::warn!(verpasst, "Presence-Events verpasst – Counter ungenau");
                    metriken.sitzungen_setzen(registry.anzahl());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

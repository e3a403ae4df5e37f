//! flurfunk-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und verdrahtet die Subsysteme:
//! UDP-Listener, Connection Registry, Keepalive-Supervisor und die
//! Standard-Source-Lines.

pub mod config;
pub mod gateway;

use anyhow::{Context, Result};
use config::ServerConfig;
use flurfunk_audio::line::{LineMetadaten, LineRegistry, SourceLine};
use flurfunk_core::event::KontrollGateway;
use flurfunk_voice::keepalive::KeepaliveSupervisor;
use flurfunk_voice::udp::{UdpVoiceServer, UdpVoiceServerConfig};
use gateway::PlatzhalterGateway;
use std::sync::Arc;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. UDP-Socket binden (Listener + Registry)
    /// 2. Keepalive-Supervisor starten
    /// 3. Standard-Source-Line registrieren
    /// 4. Auf Ctrl-C warten, dann Empfangs-Loop beenden
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self
            .config
            .udp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige UDP-Adresse '{}'", self.config.udp_bind_adresse()))?;

        let mut udp_config = UdpVoiceServerConfig::neu(bind_addr);
        udp_config.sende_queue_groesse = self.config.voice.sende_queue_groesse;

        let voice_server = UdpVoiceServer::binden(udp_config)
            .await
            .context("UDP-Socket konnte nicht gebunden werden")?;
        let verbindungen = voice_server.verbindungen();

        tracing::info!(
            udp = %self.config.udp_bind_adresse(),
            "Server startet"
        );

        // Zuverlaessiger Kanal ist extern; das Platzhalter-Gateway haelt
        // Handshake und Reconnect-Pfad lauffaehig
        let gateway: Arc<dyn KontrollGateway> =
            Arc::new(PlatzhalterGateway::neu(verbindungen.clone()));

        let supervisor = KeepaliveSupervisor::neu(
            verbindungen,
            Arc::clone(&gateway),
            self.config.voice.keepalive_config(),
        );
        let supervisor_task = supervisor.starten();

        // Standard-Line fuer Naeh-Gespraeche; Addons registrieren weitere
        let lines = LineRegistry::neu();
        lines.registrieren(SourceLine::offen(LineMetadaten::neu(
            "naehe",
            "line.naehe",
            "icons/naehe.png",
            100,
        )));

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let empfangs_task = tokio::spawn(async move {
            voice_server.empfangs_loop_starten(shutdown_rx).await;
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(());
        let _ = empfangs_task.await;
        supervisor_task.abort();

        Ok(())
    }
}

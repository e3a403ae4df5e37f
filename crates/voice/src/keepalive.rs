//! Keepalive-Supervisor – Lebendigkeitspruefung und Eviction
//!
//! Ein fester Tick (Standard: 3 Sekunden) prueft alle lebenden Sessions:
//! abgelaufene werden entfernt und ueber den Kontrollkanal zum Reconnect
//! aufgefordert, allen anderen wird bei Bedarf (Standard: jede Sekunde)
//! ein Ping geschickt.
//!
//! Dieser Supervisor ist die einzige Komponente, die Sessions wegen
//! Inaktivitaet entfernen darf. Das atomare `entfernen` der Registry
//! stellt sicher, dass sich Tick und expliziter Disconnect nie doppelt
//! entfernen – und der Reconnect pro Eviction genau einmal angefordert
//! wird.

use crate::registry::UdpConnectionRegistry;
use flurfunk_core::event::KontrollGateway;
use flurfunk_protocol::voice::AudioPaket;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Zeitparameter des Supervisors
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Ohne Lebenszeichen laenger als dieser Wert gilt eine Session als tot
    pub timeout: Duration,
    /// Mindestabstand zwischen zwei gesendeten Pings pro Session
    pub ping_intervall: Duration,
    /// Abstand zwischen zwei Supervisor-Ticks
    pub tick_intervall: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            ping_intervall: Duration::from_secs(1),
            tick_intervall: Duration::from_secs(3),
        }
    }
}

// ---------------------------------------------------------------------------
// KeepaliveSupervisor
// ---------------------------------------------------------------------------

/// Hintergrund-Supervisor fuer alle UDP-Sessions
pub struct KeepaliveSupervisor {
    verbindungen: UdpConnectionRegistry,
    gateway: Arc<dyn KontrollGateway>,
    config: KeepaliveConfig,
}

impl KeepaliveSupervisor {
    /// Erstellt einen neuen Supervisor
    pub fn neu(
        verbindungen: UdpConnectionRegistry,
        gateway: Arc<dyn KontrollGateway>,
        config: KeepaliveConfig,
    ) -> Self {
        Self {
            verbindungen,
            gateway,
            config,
        }
    }

    /// Startet den periodischen Tick als tokio-Task
    pub fn starten(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(self.config.tick_intervall);
            tracing::info!(
                timeout_ms = self.config.timeout.as_millis() as u64,
                tick_ms = self.config.tick_intervall.as_millis() as u64,
                "Keepalive-Supervisor gestartet"
            );
            loop {
                intervall.tick().await;
                self.tick();
            }
        })
    }

    /// Ein einzelner Supervisor-Durchlauf ueber den Session-Snapshot
    pub fn tick(&self) {
        let ping = AudioPaket::ping();

        for session in self.verbindungen.alle() {
            if session.ist_abgelaufen(self.config.timeout) {
                // Nur wer tatsaechlich entfernt hat, fordert den Reconnect
                // an – exactly-once auch im Rennen mit einem Disconnect.
                if self.verbindungen.entfernen(&session) {
                    tracing::info!(
                        spieler = %session.spieler_id,
                        "Session-Timeout, Reconnect angefordert"
                    );
                    self.verbindungen.handshake_erwarten(session.spieler_id);
                    self.gateway.verbinden(session.spieler_id);
                }
            } else if session.seit_letztem_ping() >= self.config.ping_intervall {
                session.ping_vermerken();
                self.verbindungen.senden(&session, &ping);
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
    use crate::registry::{VerbindungsPhase, SENDE_QUEUE_GROESSE};
    use flurfunk_core::event::KontrollEreignis;
    use flurfunk_core::types::{Geheimnis, SpielerId};
    use parking_lot::Mutex;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::net::UdpSocket;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    /// Gateway-Attrappe die Reconnect-Aufforderungen mitschreibt
    #[derive(Default)]
    struct MerkGateway {
        verbunden: Mutex<Vec<SpielerId>>,
    }

    impl KontrollGateway for MerkGateway {
        fn geheimnis_ausstellen(&self, _spieler: SpielerId) -> Geheimnis {
            Geheimnis::new()
        }

        fn verbinden(&self, spieler: SpielerId) {
            self.verbunden.lock().push(spieler);
        }

        fn rundsenden(&self, _ereignis: KontrollEreignis, _ausser: Option<SpielerId>) {}
    }

    async fn aufbau() -> (UdpConnectionRegistry, Arc<MerkGateway>, KeepaliveSupervisor) {
        let socket = Arc::new(UdpSocket::bind(localhost(0)).await.unwrap());
        let registry = UdpConnectionRegistry::neu(socket, SENDE_QUEUE_GROESSE);
        let gateway = Arc::new(MerkGateway::default());
        let supervisor = KeepaliveSupervisor::neu(
            registry.clone(),
            Arc::clone(&gateway) as Arc<dyn KontrollGateway>,
            KeepaliveConfig::default(),
        );
        (registry, gateway, supervisor)
    }

    fn session_binden(
        registry: &UdpConnectionRegistry,
        port: u16,
    ) -> (SpielerId, Arc<crate::session::UdpSession>) {
        let spieler = SpielerId::new();
        let geheimnis = Geheimnis::new();
        registry.geheimnis_hinterlegen(spieler, geheimnis);
        let session = registry.binden(spieler, geheimnis, localhost(port)).unwrap();
        (spieler, session)
    }

    #[tokio::test]
    async fn abgelaufene_session_wird_beim_tick_entfernt() {
        let (registry, gateway, supervisor) = aufbau().await;
        let (spieler, session) = session_binden(&registry, 50001);

        session.empfang_altern(Duration::from_secs(60));
        supervisor.tick();

        assert_eq!(registry.anzahl(), 0, "Session muss nach dem Tick fehlen");
        assert_eq!(gateway.verbunden.lock().as_slice(), &[spieler]);
        assert_eq!(registry.phase(&spieler), VerbindungsPhase::Handshake);
    }

    #[tokio::test]
    async fn reconnect_wird_genau_einmal_angefordert() {
        let (registry, gateway, supervisor) = aufbau().await;
        let (spieler, session) = session_binden(&registry, 50002);

        session.empfang_altern(Duration::from_secs(60));
        supervisor.tick();
        // Weitere Ticks sehen die Session nicht mehr
        supervisor.tick();
        supervisor.tick();

        let verbunden = gateway.verbunden.lock();
        assert_eq!(verbunden.iter().filter(|s| **s == spieler).count(), 1);
    }

    #[tokio::test]
    async fn lebende_session_bekommt_ping() {
        let (registry, gateway, supervisor) = aufbau().await;
        let (_spieler, session) = session_binden(&registry, 50003);

        // Ping faellig machen
        session.ping_altern(Duration::from_secs(2));
        let vorher = session.seit_letztem_ping();
        supervisor.tick();

        assert!(gateway.verbunden.lock().is_empty(), "Kein Reconnect fuer lebende Session");
        assert!(
            session.seit_letztem_ping() < vorher,
            "Ping-Zeitstempel muss aktualisiert sein"
        );
        assert_eq!(registry.anzahl(), 1);
    }

    #[tokio::test]
    async fn frisch_gepingte_session_bekommt_keinen_weiteren_ping() {
        let (registry, _gateway, supervisor) = aufbau().await;
        let (_spieler, session) = session_binden(&registry, 50004);

        session.ping_altern(Duration::from_secs(2));
        supervisor.tick();
        let nach_erstem = session.seit_letztem_ping();

        supervisor.tick();
        // Der zweite Tick direkt danach darf den Zeitstempel nicht anfassen
        assert!(session.seit_letztem_ping() >= nach_erstem);
    }

    #[tokio::test]
    async fn eviction_und_disconnect_rennen_nicht_doppelt() {
        let (registry, gateway, supervisor) = aufbau().await;
        let (spieler, session) = session_binden(&registry, 50005);

        session.empfang_altern(Duration::from_secs(60));

        // Expliziter Disconnect kommt dem Tick zuvor
        registry.trennen(&spieler);
        supervisor.tick();

        assert!(
            gateway.verbunden.lock().is_empty(),
            "Nach explizitem Disconnect darf kein Reconnect angefordert werden"
        );
        assert_eq!(registry.phase(&spieler), VerbindungsPhase::KeineSession);
    }
}

//! UDP-Listener – Empfangspfad des Voice-Transports
//!
//! Bindet den UDP-Socket und verarbeitet eingehende Datagramme in einer
//! Async-Loop:
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! [Verschluesselung::entschluesseln]   <- optional, ganzer Rahmen
//!     |
//!     v
//! AudioPaket::decode()                 <- Validierung, defekt = verwerfen
//!     |
//!     +-- bekannte Adresse --> Lebenszeichen vermerken
//!     +-- unbekannte Adresse --> Handshake-Versuch (binden)
//! ```
//!
//! ## Performance
//! - Recv-Buffer wird wiederverwendet (stack-allocated)
//! - Defekte Pakete werden ohne Session-Nebenwirkung verworfen

use crate::registry::UdpConnectionRegistry;
use flurfunk_core::krypto::Verschluesselung;
use flurfunk_protocol::voice::{AudioPaket, HandshakeNutzdaten, HEADER_LAENGE, MAX_NUTZDATEN_LAENGE};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Maximale UDP-Paketgroesse (Header + Max-Nutzdaten + Puffer)
const UDP_BUFFER_GROESSE: usize = 1400;

// ---------------------------------------------------------------------------
// UdpVoiceServer-Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration fuer den UDP-Listener
#[derive(Debug, Clone)]
pub struct UdpVoiceServerConfig {
    /// Bind-Adresse (z.B. "0.0.0.0:24454")
    pub bind_addr: SocketAddr,
    /// Groesse der Send-Queue pro Session
    pub sende_queue_groesse: usize,
}

impl UdpVoiceServerConfig {
    /// Erstellt eine Konfiguration mit Standard-Werten
    pub fn neu(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            sende_queue_groesse: crate::registry::SENDE_QUEUE_GROESSE,
        }
    }
}

// ---------------------------------------------------------------------------
// UdpVoiceServer
// ---------------------------------------------------------------------------

/// UDP Voice Server
///
/// Besitzt den Socket und die daran haengende [`UdpConnectionRegistry`].
pub struct UdpVoiceServer {
    socket: Arc<UdpSocket>,
    verbindungen: UdpConnectionRegistry,
    verschluesselung: Option<Arc<dyn Verschluesselung>>,
}

impl UdpVoiceServer {
    /// Bindet den UDP-Socket und erstellt Server samt Registry
    pub async fn binden(config: UdpVoiceServerConfig) -> std::io::Result<Self> {
        Self::binden_mit_verschluesselung(config, None).await
    }

    /// Bindet den Socket mit optionaler Rahmen-Verschluesselung
    pub async fn binden_mit_verschluesselung(
        config: UdpVoiceServerConfig,
        verschluesselung: Option<Arc<dyn Verschluesselung>>,
    ) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        tracing::info!(addr = %config.bind_addr, "UDP Voice Server gebunden");

        let verbindungen = UdpConnectionRegistry::mit_verschluesselung(
            Arc::clone(&socket),
            config.sende_queue_groesse,
            verschluesselung.clone(),
        );

        Ok(Self {
            socket,
            verbindungen,
            verschluesselung,
        })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Gibt ein Handle auf die Connection Registry zurueck
    pub fn verbindungen(&self) -> UdpConnectionRegistry {
        self.verbindungen.clone()
    }

    /// Startet die Empfangs-Loop (laeuft bis `shutdown_rx` ein Signal sendet)
    pub async fn empfangs_loop_starten(
        &self,
        mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        // Stack-allokierter Empfangspuffer – wird wiederverwendet
        let mut buf = [0u8; UDP_BUFFER_GROESSE];

        tracing::info!("Voice-Empfangs-Loop gestartet");

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, absender)) => {
                            self.datagramm_verarbeiten(&buf[..len], absender);
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                            // Kurze Pause gegen Busy-Loop bei persistentem Fehler
                            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    tracing::info!("Voice-Server: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        tracing::info!("Voice-Empfangs-Loop beendet");
    }

    // -----------------------------------------------------------------------
    // Internes Datagramm-Processing
    // -----------------------------------------------------------------------

    /// Verarbeitet ein eingehendes Datagramm
    ///
    /// Hot Path: frueher Ausstieg bei jedem Fehler, nie ein harter
    /// Fehlerpfad – das schlimmste Ergebnis ist ein verworfenes Paket.
    fn datagramm_verarbeiten(&self, daten: &[u8], absender: SocketAddr) {
        let roh: Cow<'_, [u8]> = match &self.verschluesselung {
            None => Cow::Borrowed(daten),
            Some(krypto) => match krypto.entschluesseln(daten) {
                Ok(klartext) => Cow::Owned(klartext),
                Err(e) => {
                    tracing::debug!(fehler = %e, absender = %absender, "Entschluesselung fehlgeschlagen");
                    return;
                }
            },
        };

        let paket = match AudioPaket::decode(&roh) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(fehler = %e, absender = %absender, "Defektes Datagramm verworfen");
                return;
            }
        };

        match self.verbindungen.spieler_von_adresse(&absender) {
            // Bekannte Session: Ping wie Audio zaehlen als Lebenszeichen.
            // Das Routing eingehender Audio-Daten an Quellen ist Sache der
            // Host-Logik, nicht dieses Transports.
            Some(spieler) => {
                if let Some(session) = self.verbindungen.holen(&spieler) {
                    session.empfang_vermerken();
                }
                tracing::trace!(
                    spieler = %spieler,
                    sequenz = paket.sequenz,
                    bytes = daten.len(),
                    "Datagramm von bekannter Session"
                );
            }

            // Unbekannter Absender: nur ein Handshake ist zulaessig
            None => match HandshakeNutzdaten::decode(&paket.nutzdaten) {
                Ok(hs) => {
                    match self
                        .verbindungen
                        .binden(hs.spieler_id, hs.geheimnis, absender)
                    {
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(
                                fehler = %e,
                                absender = %absender,
                                "Handshake abgelehnt"
                            );
                        }
                    }
                }
                Err(_) => {
                    tracing::debug!(absender = %absender, "Datagramm von unbekanntem Absender verworfen");
                }
            },
        }
    }
}

// sanity: der Puffer muss jeden gueltigen Rahmen fassen
const _: () = assert!(UDP_BUFFER_GROESSE >= HEADER_LAENGE + MAX_NUTZDATEN_LAENGE);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use flurfunk_core::types::{Geheimnis, SpielerId};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn test_server() -> UdpVoiceServer {
        UdpVoiceServer::binden(UdpVoiceServerConfig::neu(localhost(0)))
            .await
            .expect("Server muss binden koennen")
    }

    #[tokio::test]
    async fn server_binden() {
        let server = test_server().await;
        let addr = server.lokale_adresse().expect("Adresse muss verfuegbar sein");
        assert_ne!(addr.port(), 0, "OS muss einen Port zuweisen");
    }

    #[tokio::test]
    async fn handshake_datagramm_bindet_session() {
        let server = test_server().await;
        let registry = server.verbindungen();

        let spieler = SpielerId::new();
        let geheimnis = Geheimnis::new();
        registry.geheimnis_hinterlegen(spieler, geheimnis);

        let hs = HandshakeNutzdaten::neu(spieler, geheimnis);
        let rahmen = AudioPaket::neu(0, hs.encode().to_vec());
        server.datagramm_verarbeiten(&rahmen.encode(), localhost(40001));

        assert_eq!(registry.anzahl(), 1);
        assert_eq!(registry.spieler_von_adresse(&localhost(40001)), Some(spieler));
    }

    #[tokio::test]
    async fn handshake_mit_falschem_geheimnis_wird_abgelehnt() {
        let server = test_server().await;
        let registry = server.verbindungen();

        let spieler = SpielerId::new();
        registry.geheimnis_hinterlegen(spieler, Geheimnis::new());

        let hs = HandshakeNutzdaten::neu(spieler, Geheimnis::new());
        let rahmen = AudioPaket::neu(0, hs.encode().to_vec());
        server.datagramm_verarbeiten(&rahmen.encode(), localhost(40002));

        assert_eq!(registry.anzahl(), 0);
    }

    #[tokio::test]
    async fn ping_von_bekannter_session_ist_lebenszeichen() {
        let server = test_server().await;
        let registry = server.verbindungen();

        let spieler = SpielerId::new();
        let geheimnis = Geheimnis::new();
        registry.geheimnis_hinterlegen(spieler, geheimnis);
        let session = registry.binden(spieler, geheimnis, localhost(40003)).unwrap();

        session.empfang_altern(Duration::from_secs(60));
        assert!(session.ist_abgelaufen(Duration::from_secs(30)));

        server.datagramm_verarbeiten(&AudioPaket::ping().encode(), localhost(40003));
        assert!(!session.ist_abgelaufen(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn defektes_datagramm_hat_keine_nebenwirkung() {
        let server = test_server().await;
        let registry = server.verbindungen();

        server.datagramm_verarbeiten(&[0xFF; 5], localhost(40004));
        assert_eq!(registry.anzahl(), 0);
    }

    #[tokio::test]
    async fn empfangs_loop_end_to_end() {
        let server = Arc::new(test_server().await);
        let registry = server.verbindungen();
        let server_addr = server.lokale_adresse().unwrap();

        let spieler = SpielerId::new();
        let geheimnis = Geheimnis::new();
        registry.geheimnis_hinterlegen(spieler, geheimnis);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_clone = Arc::clone(&server);
        let recv_task = tokio::spawn(async move {
            server_clone.empfangs_loop_starten(shutdown_rx).await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        // Client schickt seinen Handshake-Rahmen
        let client = UdpSocket::bind(localhost(0)).await.unwrap();
        let hs = HandshakeNutzdaten::neu(spieler, geheimnis);
        let rahmen = AudioPaket::neu(0, hs.encode().to_vec());
        client.send_to(&rahmen.encode(), server_addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.anzahl(), 1);

        let _ = shutdown_tx.send(());
        recv_task.await.unwrap();
    }
}

//! UDP-Session – eine lebende unzuverlaessige Verbindung pro Spieler
//!
//! Jede Session haelt neben Identitaet und Zieladresse zwei monotone
//! Zeitstempel fuer die Lebendigkeitspruefung und eine eigene
//! Send-Queue mit dediziertem Sende-Task (verhindert
//! Head-of-Line-Blocking zwischen Clients).

use flurfunk_core::types::{Geheimnis, SpielerId};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ClientSenderHandle – Sende-Task pro Session
// ---------------------------------------------------------------------------

/// Handle auf den Sende-Task einer Session
///
/// Pakete werden ueber die mpsc-Queue eingereiht und vom Task via UDP
/// verschickt. Wird das Handle gedroppt, laeuft die Queue leer und der
/// Task beendet sich.
pub struct ClientSenderHandle {
    tx: mpsc::Sender<Arc<Vec<u8>>>,
    _task: tokio::task::JoinHandle<()>,
}

impl ClientSenderHandle {
    /// Startet einen neuen Sende-Task fuer eine Zieladresse
    pub fn starten(socket: Arc<UdpSocket>, ziel: SocketAddr, queue_groesse: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<Vec<u8>>>(queue_groesse);

        let task = tokio::spawn(async move {
            while let Some(daten) = rx.recv().await {
                if let Err(e) = socket.send_to(&daten, ziel).await {
                    tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
                }
            }
            tracing::debug!(ziel = %ziel, "Sende-Task beendet");
        });

        Self { tx, _task: task }
    }

    /// Reiht einen Rahmen nicht-blockierend ein
    ///
    /// Bei voller Queue wird verworfen (UDP-Semantik), bei geschlossener
    /// Queue ist die Session bereits tot. Beides ist kein Fehler.
    pub fn senden(&self, daten: Arc<Vec<u8>>) -> bool {
        match self.tx.try_send(daten) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Send-Queue voll – Rahmen verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Send-Queue geschlossen (Session beendet)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UdpSession
// ---------------------------------------------------------------------------

/// Eine lebende UDP-Session eines Spielers
///
/// Erzeugt wird sie ausschliesslich von der Registry nach erfolgreichem
/// Handshake; zerstoert wird sie nur vom Keepalive-Supervisor (Timeout)
/// oder durch expliziten Disconnect.
pub struct UdpSession {
    /// Spieler dem diese Session gehoert
    pub spieler_id: SpielerId,
    /// Beim Handshake verifiziertes Geheimnis
    pub geheimnis: Geheimnis,
    /// Remote-Adresse des Clients
    pub addr: SocketAddr,
    /// Zeitpunkt des letzten empfangenen Keepalives/Audio-Pakets
    letzter_empfang: Mutex<Instant>,
    /// Zeitpunkt des letzten gesendeten Keepalives
    letzter_ping: Mutex<Instant>,
    sender: ClientSenderHandle,
}

impl UdpSession {
    /// Erstellt eine neue Session; beide Zeitstempel starten bei "jetzt"
    pub(crate) fn neu(
        spieler_id: SpielerId,
        geheimnis: Geheimnis,
        addr: SocketAddr,
        sender: ClientSenderHandle,
    ) -> Self {
        let jetzt = Instant::now();
        Self {
            spieler_id,
            geheimnis,
            addr,
            letzter_empfang: Mutex::new(jetzt),
            letzter_ping: Mutex::new(jetzt),
            sender,
        }
    }

    /// Vermerkt ein empfangenes Lebenszeichen (Keepalive oder Audio)
    pub fn empfang_vermerken(&self) {
        *self.letzter_empfang.lock() = Instant::now();
    }

    /// Vermerkt einen gesendeten Keepalive
    pub fn ping_vermerken(&self) {
        *self.letzter_ping.lock() = Instant::now();
    }

    /// Zeit seit dem letzten empfangenen Lebenszeichen
    pub fn seit_letztem_empfang(&self) -> Duration {
        self.letzter_empfang.lock().elapsed()
    }

    /// Zeit seit dem letzten gesendeten Keepalive
    pub fn seit_letztem_ping(&self) -> Duration {
        self.letzter_ping.lock().elapsed()
    }

    /// Prueft ob die Session als tot gilt (kein Lebenszeichen seit `timeout`)
    pub fn ist_abgelaufen(&self, timeout: Duration) -> bool {
        self.seit_letztem_empfang() > timeout
    }

    /// Reiht einen fertig kodierten Rahmen in die Send-Queue ein
    pub fn senden(&self, daten: Arc<Vec<u8>>) -> bool {
        self.sender.senden(daten)
    }

    /// Setzt den Empfangs-Zeitstempel kuenstlich zurueck (nur Tests)
    #[cfg(test)]
    pub(crate) fn empfang_altern(&self, um: Duration) {
        *self.letzter_empfang.lock() = Instant::now() - um;
    }

    /// Setzt den Ping-Zeitstempel kuenstlich zurueck (nur Tests)
    #[cfg(test)]
    pub(crate) fn ping_altern(&self, um: Duration) {
        *self.letzter_ping.lock() = Instant::now() - um;
    }
}

impl std::fmt::Debug for UdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSession")
            .field("spieler_id", &self.spieler_id)
            .field("addr", &self.addr)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn test_session() -> UdpSession {
        let socket = Arc::new(UdpSocket::bind(localhost(0)).await.unwrap());
        let sender = ClientSenderHandle::starten(Arc::clone(&socket), localhost(9), 8);
        UdpSession::neu(SpielerId::new(), Geheimnis::new(), localhost(9), sender)
    }

    #[tokio::test]
    async fn frische_session_ist_nicht_abgelaufen() {
        let session = test_session().await;
        assert!(!session.ist_abgelaufen(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn gealterte_session_ist_abgelaufen() {
        let session = test_session().await;
        session.empfang_altern(Duration::from_secs(60));
        assert!(session.ist_abgelaufen(Duration::from_secs(30)));

        // Ein Lebenszeichen setzt den Zaehler zurueck
        session.empfang_vermerken();
        assert!(!session.ist_abgelaufen(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn senden_an_lebende_queue() {
        let session = test_session().await;
        assert!(session.senden(Arc::new(vec![1, 2, 3])));
    }

    #[tokio::test]
    async fn volle_queue_verwirft_statt_zu_blockieren() {
        // Queue-Groesse 1 und ein Ziel, das nie liest: der zweite und
        // dritte Rahmen muessen sofort verworfen werden.
        let socket = Arc::new(UdpSocket::bind(localhost(0)).await.unwrap());
        let sender = ClientSenderHandle::starten(Arc::clone(&socket), localhost(9), 1);
        let session = UdpSession::neu(SpielerId::new(), Geheimnis::new(), localhost(9), sender);

        let daten = Arc::new(vec![0u8; 16]);
        // Mindestens einer der drei Versuche trifft auf eine volle Queue,
        // keiner davon blockiert.
        let ergebnisse: Vec<bool> = (0..3).map(|_| session.senden(Arc::clone(&daten))).collect();
        assert!(ergebnisse.iter().any(|ok| *ok));
    }
}

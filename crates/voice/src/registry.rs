//! UDP Connection Registry – genau eine lebende Session pro Spieler
//!
//! Verwaltet Handshake-Geheimnisse, das Binden eingehender Pings an
//! Sessions und den Versand fertig kodierter Rahmen. Thread-safe und
//! `Clone`-faehig (innerer Arc).
//!
//! ## Concurrency
//! - DashMap pro Index: viele parallele Leser, serialisierte Schreiber,
//!   Leser werden nie blockiert
//! - `alle()` liefert einen Snapshot – Iteration bleibt gueltig waehrend
//!   Sessions parallel gebunden/entfernt werden
//! - `entfernen()` ist atomar "remove if same" und damit der einzige
//!   Pfad, auf dem sich Supervisor-Tick und expliziter Disconnect nicht
//!   doppelt entfernen koennen

use crate::session::{ClientSenderHandle, UdpSession};
use dashmap::DashMap;
use flurfunk_core::error::{FlurfunkError, Result};
use flurfunk_core::krypto::Verschluesselung;
use flurfunk_core::types::{Geheimnis, SpielerId};
use flurfunk_protocol::voice::AudioPaket;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Standard-Groesse der Send-Queue pro Session (Rahmen)
pub const SENDE_QUEUE_GROESSE: usize = 128;

// ---------------------------------------------------------------------------
// VerbindungsPhase
// ---------------------------------------------------------------------------

/// Zustand des UDP-Pfads eines Spielers
///
/// ```text
/// KeineSession -> Handshake -> Aktiv -> (Timeout) -> Handshake
///                                  \-> KeineSession (expliziter Disconnect)
/// ```
///
/// Der Timeout selbst ist kein eigener Dauerzustand: der Supervisor
/// entfernt die Session und fordert sofort einen Reconnect an, womit der
/// Spieler wieder in `Handshake` steht.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsPhase {
    /// Kein Geheimnis ausgestellt, keine Session
    KeineSession,
    /// Geheimnis ausgestellt, erster gueltiger UDP-Ping steht aus
    Handshake,
    /// Session gebunden und lebendig
    Aktiv,
}

// ---------------------------------------------------------------------------
// UdpConnectionRegistry
// ---------------------------------------------------------------------------

/// Registry aller lebenden UDP-Sessions
#[derive(Clone)]
pub struct UdpConnectionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    socket: Arc<UdpSocket>,
    sende_queue_groesse: usize,
    verschluesselung: Option<Arc<dyn Verschluesselung>>,
    /// Sessions, indexiert nach SpielerId
    sessions: DashMap<SpielerId, Arc<UdpSession>>,
    /// Remote-Adresse -> SpielerId fuer den Empfangspfad
    adressen: DashMap<SocketAddr, SpielerId>,
    /// Ueber den Kontrollkanal ausgestellte, noch gueltige Geheimnisse
    geheimnisse: DashMap<SpielerId, Geheimnis>,
    /// Verbindungsphase pro Spieler
    phasen: DashMap<SpielerId, VerbindungsPhase>,
}

impl UdpConnectionRegistry {
    /// Erstellt eine neue Registry ueber dem gegebenen Socket
    pub fn neu(socket: Arc<UdpSocket>, sende_queue_groesse: usize) -> Self {
        Self::mit_verschluesselung(socket, sende_queue_groesse, None)
    }

    /// Erstellt eine Registry mit optionaler Rahmen-Verschluesselung
    ///
    /// Die Verschluesselung wird ausserhalb der Codec-Grenze angewendet:
    /// der fertige Rahmen wird als Ganzes verschluesselt.
    pub fn mit_verschluesselung(
        socket: Arc<UdpSocket>,
        sende_queue_groesse: usize,
        verschluesselung: Option<Arc<dyn Verschluesselung>>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                socket,
                sende_queue_groesse,
                verschluesselung,
                sessions: DashMap::new(),
                adressen: DashMap::new(),
                geheimnisse: DashMap::new(),
                phasen: DashMap::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Hinterlegt ein ueber den Kontrollkanal ausgestelltes Geheimnis
    ///
    /// Ab jetzt gilt der Spieler als "im Handshake": der naechste
    /// gueltige UDP-Ping darf sich binden.
    pub fn geheimnis_hinterlegen(&self, spieler: SpielerId, geheimnis: Geheimnis) {
        self.inner.geheimnisse.insert(spieler, geheimnis);
        self.inner.phasen.insert(spieler, VerbindungsPhase::Handshake);
        tracing::debug!(spieler = %spieler, "Handshake-Geheimnis hinterlegt");
    }

    /// Bindet eine Remote-Adresse an eine Session
    ///
    /// Prueft das mitgelieferte Geheimnis gegen das hinterlegte. Eine
    /// bestehende Session desselben Spielers wird atomar ersetzt – bei
    /// konkurrierenden Binds gewinnt genau einer, der Verlierer
    /// hinterlaesst keinen halb initialisierten Zustand.
    ///
    /// # Fehler
    /// `UnbekanntesGeheimnis` wenn kein oder ein anderes Geheimnis
    /// hinterlegt ist; es wird keine Session erzeugt.
    pub fn binden(
        &self,
        spieler: SpielerId,
        geheimnis: Geheimnis,
        addr: SocketAddr,
    ) -> Result<Arc<UdpSession>> {
        match self.inner.geheimnisse.get(&spieler).map(|g| *g) {
            Some(hinterlegt) if hinterlegt == geheimnis => {}
            _ => return Err(FlurfunkError::UnbekanntesGeheimnis),
        }

        let sender = ClientSenderHandle::starten(
            Arc::clone(&self.inner.socket),
            addr,
            self.inner.sende_queue_groesse,
        );
        let session = Arc::new(UdpSession::neu(spieler, geheimnis, addr, sender));

        // insert ist pro Schluessel atomar: genau eine Session gewinnt
        let alte = self.inner.sessions.insert(spieler, Arc::clone(&session));
        if let Some(alt) = alte {
            self.inner
                .adressen
                .remove_if(&alt.addr, |_, sid| *sid == spieler);
            tracing::info!(spieler = %spieler, alt = %alt.addr, "Bestehende Session ersetzt");
        }
        self.inner.adressen.insert(addr, spieler);
        self.inner.phasen.insert(spieler, VerbindungsPhase::Aktiv);

        tracing::info!(spieler = %spieler, addr = %addr, "UDP-Session gebunden");
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Gibt die Session eines Spielers zurueck, falls vorhanden
    pub fn holen(&self, spieler: &SpielerId) -> Option<Arc<UdpSession>> {
        self.inner.sessions.get(spieler).map(|s| Arc::clone(&s))
    }

    /// Sucht die SpielerId zu einer Remote-Adresse (Empfangspfad)
    pub fn spieler_von_adresse(&self, addr: &SocketAddr) -> Option<SpielerId> {
        self.inner.adressen.get(addr).map(|r| *r)
    }

    /// Snapshot aller lebenden Sessions
    ///
    /// Sicher zu iterieren waehrend parallel gebunden/entfernt wird;
    /// blockiert keinen Schreiber.
    pub fn alle(&self) -> Vec<Arc<UdpSession>> {
        self.inner
            .sessions
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    /// Anzahl der lebenden Sessions
    pub fn anzahl(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Aktuelle Verbindungsphase eines Spielers
    pub fn phase(&self, spieler: &SpielerId) -> VerbindungsPhase {
        self.inner
            .phasen
            .get(spieler)
            .map(|p| *p)
            .unwrap_or(VerbindungsPhase::KeineSession)
    }

    // -----------------------------------------------------------------------
    // Entfernen
    // -----------------------------------------------------------------------

    /// Entfernt genau diese Session; idempotent
    ///
    /// Atomar "remove if same": ein veraltetes Handle kann eine
    /// inzwischen neu gebundene Session nicht entfernen. Gibt zurueck ob
    /// tatsaechlich entfernt wurde – damit ist die Eviction pro Session
    /// exactly-once, auch wenn Supervisor und Disconnect gleichzeitig
    /// zugreifen.
    pub fn entfernen(&self, session: &Arc<UdpSession>) -> bool {
        let entfernt = self
            .inner
            .sessions
            .remove_if(&session.spieler_id, |_, s| Arc::ptr_eq(s, session))
            .is_some();

        if entfernt {
            self.inner
                .adressen
                .remove_if(&session.addr, |_, sid| *sid == session.spieler_id);
            tracing::info!(spieler = %session.spieler_id, "UDP-Session entfernt");
        }
        entfernt
    }

    /// Markiert einen Spieler nach Timeout-Eviction wieder als "im Handshake"
    ///
    /// Das hinterlegte Geheimnis bleibt gueltig – die zuverlaessige
    /// Identitaet besteht weiter, nur der UDP-Pfad wird neu aufgebaut.
    pub(crate) fn handshake_erwarten(&self, spieler: SpielerId) {
        self.inner.phasen.insert(spieler, VerbindungsPhase::Handshake);
    }

    /// Expliziter Disconnect: Session, Geheimnis und Phase verschwinden
    ///
    /// Idempotent – ein bereits getrennter Spieler ist ein No-op.
    pub fn trennen(&self, spieler: &SpielerId) {
        if let Some(session) = self.holen(spieler) {
            self.entfernen(&session);
        }
        self.inner.geheimnisse.remove(spieler);
        self.inner.phasen.remove(spieler);
        tracing::debug!(spieler = %spieler, "Spieler getrennt");
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Kodiert (und verschluesselt ggf.) einen Rahmen fuer den Versand
    ///
    /// Einmal kodieren, dann per `Arc` an beliebig viele Sessions
    /// weiterreichen (kein Memcpy pro Empfaenger). `None` bei
    /// Verschluesselungsfehler – geloggt, nie fatal.
    pub fn rahmen_kodieren(&self, paket: &AudioPaket) -> Option<Arc<Vec<u8>>> {
        let roh = paket.encode();
        match &self.inner.verschluesselung {
            None => Some(Arc::new(roh)),
            Some(krypto) => match krypto.verschluesseln(&roh) {
                Ok(daten) => Some(Arc::new(daten)),
                Err(e) => {
                    tracing::warn!(fehler = %e, "Rahmen-Verschluesselung fehlgeschlagen");
                    None
                }
            },
        }
    }

    /// Reiht einen fertig kodierten Rahmen bei einer Session ein
    pub fn senden_vorbereitet(&self, session: &UdpSession, daten: Arc<Vec<u8>>) -> bool {
        session.senden(daten)
    }

    /// Best-effort-Versand eines Pakets an eine Session
    ///
    /// Fehler werden geloggt und verschluckt – der Transport ist
    /// verlustbehaftet, ein fehlgeschlagener Versand ist kein Fehlerpfad.
    pub fn senden(&self, session: &UdpSession, paket: &AudioPaket) -> bool {
        match self.rahmen_kodieren(paket) {
            Some(daten) => self.senden_vorbereitet(session, daten),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

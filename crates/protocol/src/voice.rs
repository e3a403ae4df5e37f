//! Voice-Protokoll (UDP)
//!
//! Definiert die binaere Rahmenstruktur fuer sequenzierte Audio-Pakete.
//! Direkte Byte-Serialisierung, kein serde (Hot Path).
//!
//! ## Rahmenformat (Header = 12 Bytes)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       8   Sequenznummer (u64, big-endian)
//!  8       4   Nutzdaten-Laenge (u32, big-endian)
//! 12+      N   Nutzdaten (Codec-Bytes, ggf. extern verschluesselt)
//! ```
//!
//! Kein Checksummenfeld: Integritaet liefert der Transport bzw. das
//! Auth-Tag der externen Verschluesselungsschicht. Die Sequenznummer
//! dient dem Empfaenger nur fuer Ordnungs-/Duplikat-Entscheidungen,
//! nicht der Validierung des Rahmens selbst.
//!
//! Der reservierte Rahmen mit leeren Nutzdaten ist der Ping/Keepalive.

use bytes::{Buf, BufMut};
use flurfunk_core::error::{FlurfunkError, Result};
use flurfunk_core::types::{Geheimnis, SpielerId};
use uuid::Uuid;

/// Header-Groesse in Bytes (Sequenz + Laengenfeld)
pub const HEADER_LAENGE: usize = 12;

/// Maximale Nutzdaten-Laenge (typisches Opus-MTU-Limit)
pub const MAX_NUTZDATEN_LAENGE: usize = 1280;

// ---------------------------------------------------------------------------
// AudioPaket
// ---------------------------------------------------------------------------

/// Sequenziertes Audio-Paket (UDP-Rahmen)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPaket {
    /// Monoton steigende Sequenznummer des Absenders
    pub sequenz: u64,
    /// Rohe Nutzdaten (leer = Ping)
    pub nutzdaten: Vec<u8>,
}

impl AudioPaket {
    /// Erstellt ein Audio-Paket
    pub fn neu(sequenz: u64, nutzdaten: Vec<u8>) -> Self {
        Self { sequenz, nutzdaten }
    }

    /// Erstellt den reservierten Ping/Keepalive-Rahmen
    pub fn ping() -> Self {
        Self {
            sequenz: 0,
            nutzdaten: Vec::new(),
        }
    }

    /// Prueft ob dies der reservierte Ping-Rahmen ist
    pub fn ist_ping(&self) -> bool {
        self.nutzdaten.is_empty()
    }

    /// Serialisiert den Rahmen in einen Byte-Vec (big-endian)
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LAENGE + self.nutzdaten.len());
        buf.put_u64(self.sequenz);
        buf.put_u32(self.nutzdaten.len() as u32);
        buf.put_slice(&self.nutzdaten);
        buf
    }

    /// Deserialisiert einen Rahmen aus einem Byte-Slice
    ///
    /// Liest nie ueber die deklarierte Laenge hinaus – nachlaufende Bytes
    /// in einem wiederverwendeten Puffer landen nicht in den Nutzdaten.
    ///
    /// # Fehler
    /// `UngueltigesPaket` wenn der Header unvollstaendig ist, die
    /// deklarierte Laenge das Maximum ueberschreitet oder weniger Bytes
    /// vorliegen als deklariert.
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.remaining() < HEADER_LAENGE {
            return Err(FlurfunkError::UngueltigesPaket(format!(
                "Rahmen zu kurz: {} Bytes (Header braucht {})",
                buf.remaining(),
                HEADER_LAENGE
            )));
        }

        let sequenz = buf.get_u64();
        let laenge = buf.get_u32() as usize;

        if laenge > MAX_NUTZDATEN_LAENGE {
            return Err(FlurfunkError::UngueltigesPaket(format!(
                "Nutzdaten zu lang: {} Bytes (Maximum {})",
                laenge, MAX_NUTZDATEN_LAENGE
            )));
        }

        if buf.remaining() < laenge {
            return Err(FlurfunkError::UngueltigesPaket(format!(
                "Nutzdaten unvollstaendig: {} von {} Bytes",
                buf.remaining(),
                laenge
            )));
        }

        Ok(Self {
            sequenz,
            nutzdaten: buf[..laenge].to_vec(),
        })
    }

    /// Gesamtgroesse des Rahmens in Bytes
    pub fn groesse(&self) -> usize {
        HEADER_LAENGE + self.nutzdaten.len()
    }
}

// ---------------------------------------------------------------------------
// HandshakeNutzdaten
// ---------------------------------------------------------------------------

/// Laenge der Handshake-Nutzdaten (zwei UUIDs)
pub const HANDSHAKE_LAENGE: usize = 32;

/// Nutzdaten des ersten Rahmens eines Clients: Spieler-ID + Geheimnis
///
/// Das Geheimnis wurde zuvor ueber den zuverlaessigen Kanal ausgestellt;
/// der Server bindet die Absender-Adresse erst nach erfolgreicher
/// Pruefung an die Session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeNutzdaten {
    pub spieler_id: SpielerId,
    pub geheimnis: Geheimnis,
}

impl HandshakeNutzdaten {
    /// Erstellt neue Handshake-Nutzdaten
    pub fn neu(spieler_id: SpielerId, geheimnis: Geheimnis) -> Self {
        Self {
            spieler_id,
            geheimnis,
        }
    }

    /// Serialisiert in exakt 32 Bytes (UUID-Bytes sind big-endian)
    pub fn encode(&self) -> [u8; HANDSHAKE_LAENGE] {
        let mut buf = [0u8; HANDSHAKE_LAENGE];
        buf[..16].copy_from_slice(self.spieler_id.inner().as_bytes());
        buf[16..].copy_from_slice(self.geheimnis.inner().as_bytes());
        buf
    }

    /// Deserialisiert aus einem Byte-Slice
    ///
    /// # Fehler
    /// `UngueltigesPaket` bei jeder anderen Laenge als 32 Bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != HANDSHAKE_LAENGE {
            return Err(FlurfunkError::UngueltigesPaket(format!(
                "Handshake braucht {} Bytes, erhalten {}",
                HANDSHAKE_LAENGE,
                buf.len()
            )));
        }

        let spieler = Uuid::from_slice(&buf[..16])
            .map_err(|e| FlurfunkError::UngueltigesPaket(e.to_string()))?;
        let geheimnis = Uuid::from_slice(&buf[16..])
            .map_err(|e| FlurfunkError::UngueltigesPaket(e.to_string()))?;

        Ok(Self {
            spieler_id: SpielerId(spieler),
            geheimnis: Geheimnis(geheimnis),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Server-Audio-Quellen und Fan-out-Engine
//!
//! Eine [`ServerAudioSource`] ist eine sprechende Entitaet: Identitaet,
//! besitzende Line, Filterkette und ein wrappender Generationszaehler.
//! `audio_senden` entscheidet pro Rahmen, welche verbundenen Sessions
//! ihn erhalten: Line-Sichtbarkeit, Filterkette, Distanz-Culling.
//!
//! ## Concurrency
//! - Filterliste und Line-Slot liegen hinter kurzen parking_lot-Locks;
//!   der Fan-out arbeitet auf Snapshots und blockiert keine Mutatoren
//! - Der Generationszaehler ist ein Atomic an der Quelle selbst – kein
//!   breiterer Lock; konkurrierende Mutationen duerfen um den Endwert
//!   rennen, aber jede semantische Aenderung erhoeht mindestens einmal

use flurfunk_core::pos::PositionsAnbieter;
use flurfunk_core::error::{FlurfunkError, Result};
use flurfunk_core::types::{QuellenId, SpielerId};
use flurfunk_protocol::voice::AudioPaket;
use flurfunk_voice::registry::UdpConnectionRegistry;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use crate::line::SourceLine;

/// Filter-Praedikat ueber die Hoerer-Identitaet
///
/// Alle registrierten Filter werden UND-verknuepft und in
/// Einfuegereihenfolge mit Short-Circuit ausgewertet.
pub type SpielerFilter = Arc<dyn Fn(&SpielerId) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// ServerAudioSource
// ---------------------------------------------------------------------------

/// Eine serverseitige Audio-Quelle
///
/// Die Lebenszeit gehoert dem logischen Besitzer (Addon/Spiel-Logik),
/// nicht einem Spieler. Nach [`zerstoeren`](Self::zerstoeren) wird kein
/// Audio mehr geroutet.
pub struct ServerAudioSource {
    id: QuellenId,
    /// Besitzendes Addon (nur Herkunfts-Tag, keine Lebenszeit-Kopplung an Spieler)
    addon: String,
    stereo: AtomicBool,
    codec: RwLock<Option<String>>,
    icon_sichtbar: AtomicBool,
    winkel: AtomicI32,
    /// Wrappender Generationszaehler im Vorzeichen-Byte-Raum, startet bei 1
    zustand: AtomicI32,
    zerstoert: AtomicBool,
    line: RwLock<Arc<SourceLine>>,
    filter: RwLock<Vec<SpielerFilter>>,
    verbindungen: UdpConnectionRegistry,
    positionen: Arc<dyn PositionsAnbieter>,
}

impl ServerAudioSource {
    /// Erstellt eine neue Quelle auf der gegebenen Line
    pub fn neu(
        addon: impl Into<String>,
        line: Arc<SourceLine>,
        stereo: bool,
        codec: Option<String>,
        verbindungen: UdpConnectionRegistry,
        positionen: Arc<dyn PositionsAnbieter>,
    ) -> Self {
        Self {
            id: QuellenId::new(),
            addon: addon.into(),
            stereo: AtomicBool::new(stereo),
            codec: RwLock::new(codec),
            icon_sichtbar: AtomicBool::new(true),
            winkel: AtomicI32::new(0),
            zustand: AtomicI32::new(1),
            zerstoert: AtomicBool::new(false),
            line: RwLock::new(line),
            filter: RwLock::new(Vec::new()),
            verbindungen,
            positionen,
        }
    }

    /// ID der Quelle
    pub fn id(&self) -> QuellenId {
        self.id
    }

    /// Name des besitzenden Addons
    pub fn addon(&self) -> &str {
        &self.addon
    }

    /// Aktuelle Line der Quelle
    pub fn line(&self) -> Arc<SourceLine> {
        Arc::clone(&self.line.read())
    }

    /// Stereo-Flag
    pub fn ist_stereo(&self) -> bool {
        self.stereo.load(Ordering::SeqCst)
    }

    /// Codec-Hinweis fuer die Empfaenger
    pub fn codec(&self) -> Option<String> {
        self.codec.read().clone()
    }

    /// Icon-Sichtbarkeit
    pub fn ist_icon_sichtbar(&self) -> bool {
        self.icon_sichtbar.load(Ordering::SeqCst)
    }

    /// Aktueller Winkel
    pub fn winkel(&self) -> i32 {
        self.winkel.load(Ordering::SeqCst)
    }

    /// Aktueller Wert des Generationszaehlers
    ///
    /// Empfaenger lesen den Wert nur als opakes "hat sich etwas an der
    /// Identitaet geaendert"-Signal – die absolute Zahl traegt keine
    /// Bedeutung.
    pub fn zustand(&self) -> i32 {
        self.zustand.load(Ordering::SeqCst)
    }

    /// Prueft ob die Quelle zerstoert wurde
    pub fn ist_zerstoert(&self) -> bool {
        self.zerstoert.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Mutationen
    // -----------------------------------------------------------------------

    /// Setzt die Icon-Sichtbarkeit; erhoeht den Zaehler bei Aenderung
    pub fn icon_sichtbar_setzen(&self, sichtbar: bool) {
        if self.icon_sichtbar.swap(sichtbar, Ordering::SeqCst) != sichtbar {
            self.zustand_erhoehen();
        }
    }

    /// Setzt das Stereo-Flag; erhoeht den Zaehler bei Aenderung
    pub fn stereo_setzen(&self, stereo: bool) {
        if self.stereo.swap(stereo, Ordering::SeqCst) != stereo {
            self.zustand_erhoehen();
        }
    }

    /// Setzt den Codec-Hinweis; erhoeht den Zaehler bei Aenderung
    pub fn codec_setzen(&self, codec: Option<String>) {
        let mut slot = self.codec.write();
        if *slot != codec {
            *slot = codec;
            drop(slot);
            self.zustand_erhoehen();
        }
    }

    /// Haengt die Quelle an eine andere Line; erhoeht den Zaehler
    pub fn line_setzen(&self, neue: Arc<SourceLine>) {
        let mut slot = self.line.write();
        if slot.id() != neue.id() {
            *slot = neue;
            drop(slot);
            self.zustand_erhoehen();
        }
    }

    /// Setzt den Winkel (kein verteilungsrelevantes Attribut)
    pub fn winkel_setzen(&self, winkel: i32) {
        self.winkel.store(winkel, Ordering::SeqCst);
    }

    /// Zerstoert die Quelle; ab jetzt wird kein Audio mehr geroutet
    pub fn zerstoeren(&self) {
        self.zerstoert.store(true, Ordering::SeqCst);
        tracing::debug!(quelle = %self.id, "Audio-Quelle zerstoert");
    }

    /// Erhoeht den Generationszaehler mit explizitem Byte-Wrap
    ///
    /// Modulo 256 im Vorzeichen-Byte-Raum: ueber `i8::MAX` hinaus geht
    /// es bei `i8::MIN` weiter – der beobachtbare Umschlagpunkt ist
    /// damit auf allen Targets identisch.
    fn zustand_erhoehen(&self) {
        let _ = self
            .zustand
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |alt| {
                let neu = alt + 1;
                Some(if neu > i8::MAX as i32 {
                    i8::MIN as i32
                } else {
                    neu
                })
            });
    }

    // -----------------------------------------------------------------------
    // Filterkette
    // -----------------------------------------------------------------------

    /// Haengt ein Filter-Praedikat an die Kette an
    ///
    /// # Fehler
    /// `DoppelterFilter` wenn genau dieses Praedikat (Pointer-Identitaet)
    /// bereits registriert ist; die Kette bleibt unveraendert.
    pub fn filter_hinzufuegen(&self, filter: SpielerFilter) -> Result<()> {
        let mut kette = self.filter.write();
        if kette.iter().any(|f| Arc::ptr_eq(f, &filter)) {
            return Err(FlurfunkError::DoppelterFilter);
        }
        kette.push(filter);
        Ok(())
    }

    /// Entfernt ein Filter-Praedikat; gibt zurueck ob es vorhanden war
    pub fn filter_entfernen(&self, filter: &SpielerFilter) -> bool {
        let mut kette = self.filter.write();
        let vorher = kette.len();
        kette.retain(|f| !Arc::ptr_eq(f, filter));
        kette.len() != vorher
    }

    /// Anzahl registrierter Filter
    pub fn filter_anzahl(&self) -> usize {
        self.filter.read().len()
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    /// Verteilt einen Audio-Rahmen an alle hoerberechtigten Sessions
    ///
    /// `reichweite` ist in Halbeinheiten gespeichert: vor dem Quadrieren
    /// wird verdoppelt (fester Vertrag des Konfigurationsformats, nicht
    /// herleiten oder "korrigieren"). Pro Session gilt: erst die
    /// Line-Sichtbarkeit (impliziter Filter), dann jede explizite
    /// Filterstufe in Einfuegereihenfolge mit Short-Circuit, dann das
    /// Distanz-Culling ueber quadrierte Distanzen.
    ///
    /// Zustellung ist nie garantiert: fehlgeschlagene Sends, fehlende
    /// Positionen und Filter-Ablehnungen sind stille Ausschluesse.
    /// Gibt die Anzahl eingereihter Zustellungen zurueck.
    pub fn audio_senden(&self, paket: &AudioPaket, reichweite: u16) -> usize {
        if self.ist_zerstoert() {
            return 0;
        }

        let distanz = f64::from(reichweite) * 2.0;
        let distanz_quadrat = distanz * distanz;

        let quellen_pos = match self.positionen.quellen_position(&self.id) {
            Some(pos) => pos,
            None => {
                tracing::debug!(quelle = %self.id, "Keine Quellen-Position, nichts gesendet");
                return 0;
            }
        };

        // Einmal kodieren, dann nur noch Arc-Klone pro Empfaenger
        let daten = match self.verbindungen.rahmen_kodieren(paket) {
            Some(daten) => daten,
            None => return 0,
        };

        let line = self.line();
        let kette = self.filter.read().clone();

        let mut zugestellt = 0usize;
        'sessions: for session in self.verbindungen.alle() {
            let spieler = session.spieler_id;

            if !line.ist_hoerbar(&spieler) {
                continue;
            }
            for filter in &kette {
                if !(**filter)(&spieler) {
                    continue 'sessions;
                }
            }

            let spieler_pos = match self.positionen.spieler_position(&spieler) {
                Some(pos) => pos,
                None => continue,
            };
            if quellen_pos.abstand_quadrat(&spieler_pos) <= distanz_quadrat
                && self
                    .verbindungen
                    .senden_vorbereitet(&session, Arc::clone(&daten))
            {
                zugestellt += 1;
            }
        }

        tracing::trace!(
            quelle = %self.id,
            sequenz = paket.sequenz,
            empfaenger = zugestellt,
            "Audio-Rahmen verteilt"
        );
        zugestellt
    }
}

impl std::fmt::Debug for ServerAudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerAudioSource")
            .field("id", &self.id)
            .field("addon", &self.addon)
            .field("line", &self.line.read().id())
            .field("zustand", &self.zustand())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Source-Lines – benannte Kanaele fuer Audio-Quellen
//!
//! Eine Line buendelt Quellen unter einem Namen (z.B. "Naehe", "Funk").
//! Zwei Varianten mit gemeinsamen Metadaten: **offene** Lines sind fuer
//! alle Spieler hoerbar, **beschraenkte** nur fuer die explizit
//! autorisierten. Jede Aenderung an der Autorisierungsmenge wird ueber
//! den Kontrollkanal an alle Clients verteilt, damit deren lokale Sicht
//! synchron zum Server bleibt.

use dashmap::{DashMap, DashSet};
use flurfunk_core::event::{KontrollEreignis, KontrollGateway};
use flurfunk_core::types::{LineId, SpielerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// LineMetadaten
// ---------------------------------------------------------------------------

/// Gemeinsame Metadaten beider Line-Varianten
///
/// `gewicht` steuert nur die Anzeige-Reihenfolge im Client, nie die
/// Routing-Semantik.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMetadaten {
    pub id: LineId,
    /// Technischer Name (eindeutig pro Server)
    pub name: String,
    /// Anzeigetext bzw. Uebersetzungsschluessel
    pub uebersetzung: String,
    /// Icon-Referenz fuer die Client-Anzeige
    pub icon: String,
    /// Anzeige-Gewicht (hoeher = weiter oben)
    pub gewicht: i32,
}

impl LineMetadaten {
    /// Erstellt Metadaten mit frischer Line-ID
    pub fn neu(
        name: impl Into<String>,
        uebersetzung: impl Into<String>,
        icon: impl Into<String>,
        gewicht: i32,
    ) -> Self {
        Self {
            id: LineId::new(),
            name: name.into(),
            uebersetzung: uebersetzung.into(),
            icon: icon.into(),
            gewicht,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayersSourceLine – beschraenkte Variante
// ---------------------------------------------------------------------------

/// Beschraenkte Source-Line mit expliziter Autorisierungsmenge
///
/// Die Menge wird konkurrierend gelesen (jeder Fan-out-Aufruf) und
/// mutiert (autorisieren/entziehen/leeren); DashSet liefert dafuer
/// Snapshot-artige Reads ohne Leser zu blockieren.
pub struct PlayersSourceLine {
    meta: LineMetadaten,
    spieler: DashSet<SpielerId>,
    gateway: Arc<dyn KontrollGateway>,
}

impl PlayersSourceLine {
    /// Erstellt eine beschraenkte Line mit leerer Autorisierungsmenge
    pub fn neu(meta: LineMetadaten, gateway: Arc<dyn KontrollGateway>) -> Self {
        Self {
            meta,
            spieler: DashSet::new(),
            gateway,
        }
    }

    /// Autorisiert einen Spieler; idempotent
    ///
    /// Das Ereignis geht nur bei tatsaechlicher Neuaufnahme raus – ein
    /// wiederholtes Autorisieren erzeugt keinen Broadcast.
    pub fn autorisieren(&self, spieler: SpielerId) {
        if self.spieler.insert(spieler) {
            self.gateway.rundsenden(
                KontrollEreignis::LineSpielerAutorisiert {
                    line_id: self.meta.id,
                    spieler_id: spieler,
                },
                None,
            );
            tracing::debug!(line = %self.meta.id, spieler = %spieler, "Spieler autorisiert");
        }
    }

    /// Entzieht einem Spieler die Autorisierung
    ///
    /// Gibt zurueck ob der Spieler tatsaechlich entfernt wurde; nur dann
    /// geht das Ereignis raus.
    pub fn entziehen(&self, spieler: &SpielerId) -> bool {
        if self.spieler.remove(spieler).is_some() {
            self.gateway.rundsenden(
                KontrollEreignis::LineSpielerEntzogen {
                    line_id: self.meta.id,
                    spieler_id: *spieler,
                },
                None,
            );
            tracing::debug!(line = %self.meta.id, spieler = %spieler, "Autorisierung entzogen");
            return true;
        }
        false
    }

    /// Entfernt alle Autorisierungen; das Ereignis geht immer raus
    pub fn leeren(&self) {
        self.spieler.clear();
        self.gateway.rundsenden(
            KontrollEreignis::LineAutorisierungenGeleert {
                line_id: self.meta.id,
            },
            None,
        );
        tracing::debug!(line = %self.meta.id, "Autorisierungen geleert");
    }

    /// Prueft ob ein Spieler autorisiert ist
    pub fn ist_autorisiert(&self, spieler: &SpielerId) -> bool {
        self.spieler.contains(spieler)
    }

    /// Anzahl autorisierter Spieler
    pub fn anzahl(&self) -> usize {
        self.spieler.len()
    }
}

impl std::fmt::Debug for PlayersSourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayersSourceLine")
            .field("meta", &self.meta)
            .field("autorisiert", &self.spieler.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SourceLine
// ---------------------------------------------------------------------------

/// Eine Source-Line: offen fuer alle oder auf Spieler beschraenkt
///
/// Die beschraenkten Operationen (autorisieren/entziehen/leeren) sind
/// nur auf der Spieler-Variante erreichbar.
#[derive(Debug)]
pub enum SourceLine {
    /// Alle Spieler sind implizit hoerberechtigt
    Offen(LineMetadaten),
    /// Nur die autorisierte Menge ist hoerberechtigt
    Spieler(PlayersSourceLine),
}

impl SourceLine {
    /// Erstellt eine offene Line
    pub fn offen(meta: LineMetadaten) -> Arc<Self> {
        Arc::new(Self::Offen(meta))
    }

    /// Erstellt eine beschraenkte Line mit leerer Autorisierungsmenge
    pub fn mit_spielern(meta: LineMetadaten, gateway: Arc<dyn KontrollGateway>) -> Arc<Self> {
        Arc::new(Self::Spieler(PlayersSourceLine::neu(meta, gateway)))
    }

    /// Gemeinsame Metadaten der Line
    pub fn meta(&self) -> &LineMetadaten {
        match self {
            Self::Offen(meta) => meta,
            Self::Spieler(line) => &line.meta,
        }
    }

    /// ID der Line
    pub fn id(&self) -> LineId {
        self.meta().id
    }

    /// Entscheidet ob ein Spieler Quellen auf dieser Line hoeren darf
    ///
    /// Invariante des Fan-outs: wer hier durchfaellt, wird nie als
    /// Empfaenger ausgewaehlt.
    pub fn ist_hoerbar(&self, spieler: &SpielerId) -> bool {
        match self {
            Self::Offen(_) => true,
            Self::Spieler(line) => line.ist_autorisiert(spieler),
        }
    }

    /// Zugriff auf die beschraenkte Variante, falls vorhanden
    pub fn als_spieler_line(&self) -> Option<&PlayersSourceLine> {
        match self {
            Self::Offen(_) => None,
            Self::Spieler(line) => Some(line),
        }
    }
}

// ---------------------------------------------------------------------------
// LineRegistry
// ---------------------------------------------------------------------------

/// Registry aller Source-Lines eines Servers
///
/// Thread-safe und `Clone`-faehig (innerer Arc).
#[derive(Clone, Default)]
pub struct LineRegistry {
    lines: Arc<DashMap<LineId, Arc<SourceLine>>>,
}

impl LineRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine Line
    pub fn registrieren(&self, line: Arc<SourceLine>) {
        tracing::debug!(line = %line.id(), name = %line.meta().name, "Source-Line registriert");
        self.lines.insert(line.id(), line);
    }

    /// Entfernt eine Line; gibt sie zurueck falls vorhanden
    pub fn entfernen(&self, id: &LineId) -> Option<Arc<SourceLine>> {
        self.lines.remove(id).map(|(_, line)| line)
    }

    /// Sucht eine Line anhand ihrer ID
    pub fn finden(&self, id: &LineId) -> Option<Arc<SourceLine>> {
        self.lines.get(id).map(|l| Arc::clone(&l))
    }

    /// Alle Lines, absteigend nach Anzeige-Gewicht sortiert
    pub fn alle(&self) -> Vec<Arc<SourceLine>> {
        let mut lines: Vec<Arc<SourceLine>> =
            self.lines.iter().map(|e| Arc::clone(e.value())).collect();
        lines.sort_by_key(|l| std::cmp::Reverse(l.meta().gewicht));
        lines
    }

    /// Anzahl registrierter Lines
    pub fn anzahl(&self) -> usize {
        self.lines.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use flurfunk_core::types::Geheimnis;
    use parking_lot::Mutex;

    /// Gateway-Attrappe die alle Rundsendungen mitschreibt
    #[derive(Default)]
    struct MerkGateway {
        ereignisse: Mutex<Vec<KontrollEreignis>>,
    }

    impl KontrollGateway for MerkGateway {
        fn geheimnis_ausstellen(&self, _spieler: SpielerId) -> Geheimnis {
            Geheimnis::new()
        }

        fn verbinden(&self, _spieler: SpielerId) {}

        fn rundsenden(&self, ereignis: KontrollEreignis, _ausser: Option<SpielerId>) {
            self.ereignisse.lock().push(ereignis);
        }
    }

    fn spieler_line() -> (Arc<SourceLine>, Arc<MerkGateway>) {
        let gateway = Arc::new(MerkGateway::default());
        let line = SourceLine::mit_spielern(
            LineMetadaten::neu("funk", "line.funk", "icons/funk.png", 10),
            Arc::clone(&gateway) as Arc<dyn KontrollGateway>,
        );
        (line, gateway)
    }

    #[test]
    fn offene_line_ist_fuer_alle_hoerbar() {
        let line = SourceLine::offen(LineMetadaten::neu("naehe", "line.naehe", "icons/n.png", 0));
        assert!(line.ist_hoerbar(&SpielerId::new()));
        assert!(line.als_spieler_line().is_none());
    }

    #[test]
    fn beschraenkte_line_laesst_nur_autorisierte_durch() {
        let (line, _gateway) = spieler_line();
        let spieler = SpielerId::new();

        assert!(!line.ist_hoerbar(&spieler));

        line.als_spieler_line().unwrap().autorisieren(spieler);
        assert!(line.ist_hoerbar(&spieler));

        line.als_spieler_line().unwrap().entziehen(&spieler);
        assert!(!line.ist_hoerbar(&spieler));
    }

    #[test]
    fn autorisieren_sendet_nur_bei_neuaufnahme() {
        let (line, gateway) = spieler_line();
        let spieler = SpielerId::new();
        let players = line.als_spieler_line().unwrap();

        players.autorisieren(spieler);
        players.autorisieren(spieler); // idempotent, kein zweiter Broadcast
        assert_eq!(players.anzahl(), 1);

        let ereignisse = gateway.ereignisse.lock();
        assert_eq!(ereignisse.len(), 1);
        assert!(matches!(
            ereignisse[0],
            KontrollEreignis::LineSpielerAutorisiert { spieler_id, .. } if spieler_id == spieler
        ));
    }

    #[test]
    fn entziehen_meldet_ob_entfernt_wurde() {
        let (line, gateway) = spieler_line();
        let spieler = SpielerId::new();
        let players = line.als_spieler_line().unwrap();

        assert!(!players.entziehen(&spieler), "Unbekannter Spieler: false");
        assert!(
            gateway.ereignisse.lock().is_empty(),
            "Kein Broadcast ohne tatsaechliche Entfernung"
        );

        players.autorisieren(spieler);
        assert!(players.entziehen(&spieler));

        let ereignisse = gateway.ereignisse.lock();
        assert_eq!(ereignisse.len(), 2);
        assert!(matches!(
            ereignisse[1],
            KontrollEreignis::LineSpielerEntzogen { spieler_id, .. } if spieler_id == spieler
        ));
    }

    #[test]
    fn leeren_sendet_immer() {
        let (line, gateway) = spieler_line();
        let players = line.als_spieler_line().unwrap();

        players.autorisieren(SpielerId::new());
        players.autorisieren(SpielerId::new());
        gateway.ereignisse.lock().clear();

        players.leeren();
        assert_eq!(players.anzahl(), 0);

        // Auch ein Leeren der leeren Menge wird verteilt
        players.leeren();

        let ereignisse = gateway.ereignisse.lock();
        assert_eq!(ereignisse.len(), 2);
        assert!(ereignisse
            .iter()
            .all(|e| matches!(e, KontrollEreignis::LineAutorisierungenGeleert { .. })));
    }

    #[test]
    fn registry_registrieren_und_finden() {
        let registry = LineRegistry::neu();
        let line = SourceLine::offen(LineMetadaten::neu("naehe", "line.naehe", "icons/n.png", 0));
        let id = line.id();

        registry.registrieren(Arc::clone(&line));
        assert_eq!(registry.anzahl(), 1);
        assert!(registry.finden(&id).is_some());

        let entfernt = registry.entfernen(&id);
        assert!(entfernt.is_some());
        assert!(registry.finden(&id).is_none());
        // Doppeltes Entfernen ist ein No-op
        assert!(registry.entfernen(&id).is_none());
    }

    #[test]
    fn alle_sortiert_nach_gewicht() {
        let registry = LineRegistry::neu();
        registry.registrieren(SourceLine::offen(LineMetadaten::neu("a", "a", "a.png", 1)));
        registry.registrieren(SourceLine::offen(LineMetadaten::neu("b", "b", "b.png", 99)));
        registry.registrieren(SourceLine::offen(LineMetadaten::neu("c", "c", "c.png", 10)));

        let gewichte: Vec<i32> = registry.alle().iter().map(|l| l.meta().gewicht).collect();
        assert_eq!(gewichte, vec![99, 10, 1]);
    }
}

//! Positions-Utility – opake 3D-Punkte fuer die Distanzrechnung
//!
//! Der Core rechnet nie selbst Welt-Koordinaten aus; Positionen kommen
//! per [`PositionsAnbieter`] vom Host (Spiel-Logik). Fuer die
//! Hoerbarkeitspruefung wird ausschliesslich die quadrierte Distanz
//! verwendet – kein `sqrt` im Hot Path.

use crate::types::{QuellenId, SpielerId};
use serde::{Deserialize, Serialize};

/// Unveraenderlicher 3D-Punkt mit Blickrichtung
///
/// `gier` (Yaw) und `neigung` (Pitch) werden der Vollstaendigkeit halber
/// mitgefuehrt, gehen aber nicht in die Distanzrechnung ein.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Horizontale Blickrichtung in Grad – fuer Distanzen irrelevant
    pub gier: f32,
    /// Vertikale Blickrichtung in Grad – fuer Distanzen irrelevant
    pub neigung: f32,
}

impl Position3D {
    /// Erstellt eine Position ohne Blickrichtung
    pub fn neu(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            gier: 0.0,
            neigung: 0.0,
        }
    }

    /// Erstellt eine Position mit Blickrichtung
    pub fn mit_blick(x: f64, y: f64, z: f64, gier: f32, neigung: f32) -> Self {
        Self {
            x,
            y,
            z,
            gier,
            neigung,
        }
    }

    /// Quadrierte Distanz zu einer anderen Position
    pub fn abstand_quadrat(&self, andere: &Position3D) -> f64 {
        let dx = self.x - andere.x;
        let dy = self.y - andere.y;
        let dz = self.z - andere.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Liefert aktuelle Positionen von Spielern und Quellen
///
/// Externe Schnittstelle – die Implementierung stellt der Host bereit
/// (Entities koennen sich zwischen zwei Aufrufen bewegen, deshalb wird
/// pro Fan-out-Aufruf frisch abgefragt). `None` bedeutet: Position
/// derzeit nicht bekannt – der Aufrufer behandelt das als stillen
/// Ausschluss, nie als Fehler.
pub trait PositionsAnbieter: Send + Sync {
    /// Aktuelle Position eines Spielers
    fn spieler_position(&self, spieler: &SpielerId) -> Option<Position3D>;

    /// Aktuelle Position einer Audio-Quelle
    fn quellen_position(&self, quelle: &QuellenId) -> Option<Position3D>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstand_quadrat_achsenparallel() {
        let a = Position3D::neu(0.0, 0.0, 0.0);
        let b = Position3D::neu(3.0, 0.0, 0.0);
        assert_eq!(a.abstand_quadrat(&b), 9.0);
    }

    #[test]
    fn abstand_quadrat_symmetrisch() {
        let a = Position3D::neu(1.0, 2.0, 3.0);
        let b = Position3D::neu(-4.0, 0.5, 7.0);
        assert_eq!(a.abstand_quadrat(&b), b.abstand_quadrat(&a));
    }

    #[test]
    fn abstand_quadrat_drei_dimensionen() {
        let a = Position3D::neu(1.0, 1.0, 1.0);
        let b = Position3D::neu(2.0, 3.0, 4.0);
        // 1 + 4 + 9
        assert_eq!(a.abstand_quadrat(&b), 14.0);
    }

    #[test]
    fn blickrichtung_geht_nicht_in_distanz_ein() {
        let a = Position3D::mit_blick(0.0, 0.0, 0.0, 90.0, 45.0);
        let b = Position3D::mit_blick(0.0, 0.0, 0.0, -90.0, 0.0);
        assert_eq!(a.abstand_quadrat(&b), 0.0);
    }
}

//! Verschluesselungs-Vertrag
//!
//! Die eigentliche Kryptografie ist ein externer Kollaborateur. Der Core
//! kennt nur den Vertrag: ein vollstaendiger Rahmen geht rein, ein
//! verschluesselter Rahmen kommt raus (und umgekehrt). Angewendet wird
//! das ausserhalb der Codec-Grenze – der Codec selbst sieht immer
//! Klartext-Rahmen.

use crate::error::Result;

/// Vertrag fuer die optionale Rahmen-Verschluesselung
pub trait Verschluesselung: Send + Sync {
    /// Verschluesselt einen vollstaendigen Rahmen
    fn verschluesseln(&self, daten: &[u8]) -> Result<Vec<u8>>;

    /// Entschluesselt einen vollstaendigen Rahmen
    fn entschluesseln(&self, daten: &[u8]) -> Result<Vec<u8>>;
}

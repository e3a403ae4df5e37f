//! Fehlertypen fuer Flurfunk
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Grundsatz: nichts in diesem Core darf den Server-Prozess beenden –
//! das schlimmste Ergebnis ist ein verworfenes Paket oder ein
//! verzoegerter Reconnect.

use thiserror::Error;

/// Globaler Result-Alias fuer Flurfunk
pub type Result<T> = std::result::Result<T, FlurfunkError>;

/// Alle moeglichen Fehler im Flurfunk-Core
#[derive(Debug, Error)]
pub enum FlurfunkError {
    // --- Wire-Format ---
    #[error("Ungueltiges Paket: {0}")]
    UngueltigesPaket(String),

    // --- Handshake & Session ---
    #[error("Unbekanntes oder falsches Session-Geheimnis")]
    UnbekanntesGeheimnis,

    #[error("Keine UDP-Session fuer diesen Spieler")]
    SessionNichtGefunden,

    // --- Quellen ---
    #[error("Filter ist bereits registriert")]
    DoppelterFilter,

    // --- Transport ---
    #[error("Senden fehlgeschlagen: {0}")]
    SendeFehler(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FlurfunkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler ein reines Transport-Ereignis ist,
    /// das geloggt und verschluckt werden darf
    pub fn ist_transient(&self) -> bool {
        matches!(self, Self::SendeFehler(_) | Self::UngueltigesPaket(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = FlurfunkError::UngueltigesPaket("Rahmen zu kurz".into());
        assert_eq!(e.to_string(), "Ungueltiges Paket: Rahmen zu kurz");
    }

    #[test]
    fn transiente_fehler_erkennung() {
        assert!(FlurfunkError::SendeFehler("Queue voll".into()).ist_transient());
        assert!(!FlurfunkError::UnbekanntesGeheimnis.ist_transient());
    }
}

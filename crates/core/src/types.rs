//! Gemeinsame Identifikationstypen fuer Flurfunk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Spieler-ID (stabil ueber Reconnects hinweg)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpielerId(pub Uuid);

impl SpielerId {
    /// Erstellt eine neue zufaellige SpielerId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SpielerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpielerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spieler:{}", self.0)
    }
}

/// Eindeutige ID einer Audio-Quelle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuellenId(pub Uuid);

impl QuellenId {
    /// Erstellt eine neue zufaellige QuellenId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for QuellenId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuellenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "quelle:{}", self.0)
    }
}

/// Eindeutige ID einer Source-Line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(pub Uuid);

impl LineId {
    /// Erstellt eine neue zufaellige LineId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line:{}", self.0)
    }
}

/// Session-Geheimnis fuer den UDP-Handshake
///
/// Wird ueber den zuverlaessigen Kanal ausgestellt und muss im ersten
/// UDP-Paket eines Clients mitgefuehrt werden. Kein `Display`-Impl,
/// damit das Geheimnis nicht versehentlich in Logs landet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geheimnis(pub Uuid);

impl Geheimnis {
    /// Erstellt ein neues zufaelliges Geheimnis
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for Geheimnis {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spieler_id_eindeutig() {
        let a = SpielerId::new();
        let b = SpielerId::new();
        assert_ne!(a, b, "Zwei neue SpielerIds muessen verschieden sein");
    }

    #[test]
    fn quellen_id_eindeutig() {
        let a = QuellenId::new();
        let b = QuellenId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn line_id_display() {
        let id = LineId(Uuid::nil());
        assert!(id.to_string().starts_with("line:"));
    }

    #[test]
    fn geheimnisse_sind_eindeutig() {
        let a = Geheimnis::new();
        let b = Geheimnis::new();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let sid = SpielerId::new();
        let json = serde_json::to_string(&sid).unwrap();
        let sid2: SpielerId = serde_json::from_str(&json).unwrap();
        assert_eq!(sid, sid2);
    }
}

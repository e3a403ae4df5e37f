//! Kontroll-Ereignisse und das Gateway zum zuverlaessigen Kanal
//!
//! Der zuverlaessige (TCP-artige) Kontrollkanal ist ein externer
//! Kollaborateur: Handshake, Reconnect-Aufforderungen und die
//! Verteilung von Autorisierungs-Ereignissen laufen darueber. Dieses
//! Modul definiert nur die Schnittstelle; die Implementierung stellt
//! der Server bzw. die Host-Integration bereit.

use crate::types::{Geheimnis, LineId, SpielerId};
use serde::{Deserialize, Serialize};

/// Ereignisse die ueber den Kontrollkanal an alle Clients gehen
///
/// Autorisierungs-Aenderungen an beschraenkten Source-Lines muessen
/// extern sichtbar werden, damit verbundene Clients ihre lokale Sicht
/// synchron zum Server-Zustand halten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KontrollEreignis {
    /// Ein Spieler wurde fuer eine beschraenkte Line autorisiert
    LineSpielerAutorisiert {
        line_id: LineId,
        spieler_id: SpielerId,
    },
    /// Einem Spieler wurde die Autorisierung entzogen
    LineSpielerEntzogen {
        line_id: LineId,
        spieler_id: SpielerId,
    },
    /// Alle Autorisierungen einer Line wurden entfernt
    LineAutorisierungenGeleert { line_id: LineId },
}

/// Gateway zum zuverlaessigen Kontrollkanal
///
/// Schnittstellen-Trait – die konkrete Implementierung (Netty-artiger
/// TCP-Stack, Host-Plugin-Messaging, ...) liegt ausserhalb des Cores.
pub trait KontrollGateway: Send + Sync {
    /// Stellt ein neues Session-Geheimnis fuer einen Spieler aus
    ///
    /// Das Geheimnis wird dem Client ueber den Kontrollkanal mitgeteilt
    /// und muss im UDP-Handshake zurueckkommen.
    fn geheimnis_ausstellen(&self, spieler: SpielerId) -> Geheimnis;

    /// Fordert einen Client auf, seinen UDP-Pfad (neu) aufzubauen
    ///
    /// Die zuverlaessige Identitaet des Spielers bleibt dabei bestehen;
    /// nur der unzuverlaessige Pfad wird neu verhandelt.
    fn verbinden(&self, spieler: SpielerId);

    /// Sendet ein Ereignis an alle verbundenen Clients
    ///
    /// `ausser` schliesst optional einen Spieler aus (z.B. den Ausloeser).
    fn rundsenden(&self, ereignis: KontrollEreignis, ausser: Option<SpielerId>);
}

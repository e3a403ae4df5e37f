//! Platzhalter-Gateway fuer den zuverlaessigen Kontrollkanal
//!
//! Der Kontrollkanal selbst (TCP/Host-Plugin-Messaging) ist ein externer
//! Kollaborateur. Dieses Gateway haelt den Handshake-Fluss lauffaehig:
//! ausgestellte Geheimnisse werden direkt in der Connection Registry
//! hinterlegt, Reconnect-Aufforderungen und Rundsendungen werden nur
//! geloggt, bis eine echte Kanal-Anbindung eingehaengt wird.

use flurfunk_core::event::{KontrollEreignis, KontrollGateway};
use flurfunk_core::types::{Geheimnis, SpielerId};
use flurfunk_voice::registry::UdpConnectionRegistry;

/// Gateway-Platzhalter ohne echten Kontrollkanal
pub struct PlatzhalterGateway {
    verbindungen: UdpConnectionRegistry,
}

impl PlatzhalterGateway {
    /// Erstellt ein Gateway ueber der gegebenen Registry
    pub fn neu(verbindungen: UdpConnectionRegistry) -> Self {
        Self { verbindungen }
    }
}

impl KontrollGateway for PlatzhalterGateway {
    fn geheimnis_ausstellen(&self, spieler: SpielerId) -> Geheimnis {
        let geheimnis = Geheimnis::new();
        self.verbindungen.geheimnis_hinterlegen(spieler, geheimnis);
        tracing::debug!(spieler = %spieler, "Geheimnis ausgestellt (Platzhalter-Gateway)");
        geheimnis
    }

    fn verbinden(&self, spieler: SpielerId) {
        tracing::info!(
            spieler = %spieler,
            "Reconnect-Aufforderung (Platzhalter – kein Kontrollkanal angebunden)"
        );
    }

    fn rundsenden(&self, ereignis: KontrollEreignis, ausser: Option<SpielerId>) {
        tracing::debug!(
            ereignis = ?ereignis,
            ausser = ?ausser,
            "Rundsendung (Platzhalter – kein Kontrollkanal angebunden)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flurfunk_voice::registry::{VerbindungsPhase, SENDE_QUEUE_GROESSE};
    use std::sync::Arc;

    #[tokio::test]
    async fn ausgestelltes_geheimnis_erlaubt_binden() {
        let socket = Arc::new(tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let registry = UdpConnectionRegistry::neu(socket, SENDE_QUEUE_GROESSE);
        let gateway = PlatzhalterGateway::neu(registry.clone());

        let spieler = SpielerId::new();
        let geheimnis = gateway.geheimnis_ausstellen(spieler);
        assert_eq!(registry.phase(&spieler), VerbindungsPhase::Handshake);

        let session = registry
            .binden(spieler, geheimnis, "127.0.0.1:45000".parse().unwrap())
            .expect("Ausgestelltes Geheimnis muss zum Binden reichen");
        assert_eq!(session.spieler_id, spieler);
    }
}

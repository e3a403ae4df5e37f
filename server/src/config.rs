//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use flurfunk_voice::keepalive::KeepaliveConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Voice/Keepalive-Einstellungen
    pub voice: VoiceEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den UDP-Socket
    pub bind_adresse: String,
    /// Port fuer UDP (Voice-Daten)
    pub udp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            udp_port: 24454,
        }
    }
}

/// Voice/Keepalive-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    /// Ohne Lebenszeichen laenger als dieser Wert gilt eine Session als tot
    pub keepalive_timeout_ms: u64,
    /// Mindestabstand zwischen zwei gesendeten Pings pro Session
    pub ping_intervall_ms: u64,
    /// Abstand zwischen zwei Supervisor-Ticks
    pub tick_intervall_ms: u64,
    /// Groesse der Send-Queue pro Session (Rahmen)
    pub sende_queue_groesse: usize,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_timeout_ms: 30_000,
            ping_intervall_ms: 1_000,
            tick_intervall_ms: 3_000,
            sende_queue_groesse: 128,
        }
    }
}

impl VoiceEinstellungen {
    /// Uebersetzt die Millisekunden-Werte in die Supervisor-Konfiguration
    pub fn keepalive_config(&self) -> KeepaliveConfig {
        KeepaliveConfig {
            timeout: Duration::from_millis(self.keepalive_timeout_ms),
            ping_intervall: Duration::from_millis(self.ping_intervall_ms),
            tick_intervall: Duration::from_millis(self.tick_intervall_ms),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.udp_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.udp_port, 24454);
        assert_eq!(cfg.voice.keepalive_timeout_ms, 30_000);
        assert_eq!(cfg.voice.ping_intervall_ms, 1_000);
        assert_eq!(cfg.voice.tick_intervall_ms, 3_000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.udp_bind_adresse(), "0.0.0.0:24454");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            udp_port = 30000

            [voice]
            keepalive_timeout_ms = 15000
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.netzwerk.udp_port, 30000);
        assert_eq!(cfg.voice.keepalive_timeout_ms, 15_000);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.voice.tick_intervall_ms, 3_000);
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
    }

    #[test]
    fn keepalive_config_uebersetzung() {
        let cfg = ServerConfig::default();
        let ka = cfg.voice.keepalive_config();
        assert_eq!(ka.timeout, Duration::from_secs(30));
        assert_eq!(ka.ping_intervall, Duration::from_secs(1));
        assert_eq!(ka.tick_intervall, Duration::from_secs(3));
    }
}

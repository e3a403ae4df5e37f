//! flurfunk-voice – UDP-Transport des Voice-Servers
//!
//! Implementiert den serverseitigen unzuverlaessigen Pfad: Session-
//! Lebenszyklus (Handshake, Lebendigkeit, Timeout, Reconnect), den
//! UDP-Listener und den Keepalive-Supervisor.
//!
//! ## Module
//! - [`session`] – UDP-Session mit Send-Queue pro Client
//! - [`registry`] – Connection Registry (eine Session pro Spieler)
//! - [`udp`] – UDP-Listener und Datagramm-Dispatch
//! - [`keepalive`] – Lebendigkeitspruefung und Eviction

pub mod keepalive;
pub mod registry;
pub mod session;
pub mod udp;

pub use keepalive::{KeepaliveConfig, KeepaliveSupervisor};
pub use registry::{UdpConnectionRegistry, VerbindungsPhase};
pub use session::UdpSession;
pub use udp::{UdpVoiceServer, UdpVoiceServerConfig};

//! flurfunk-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Flurfunk-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod krypto;
pub mod pos;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{FlurfunkError, Result};
pub use event::{KontrollEreignis, KontrollGateway};
pub use pos::{Position3D, PositionsAnbieter};
pub use types::{Geheimnis, LineId, QuellenId, SpielerId};

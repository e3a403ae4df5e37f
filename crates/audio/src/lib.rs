//! flurfunk-audio – Serverseitige Audio-Quellen und Fan-out
//!
//! Quellen gehoeren Addons bzw. der Spiel-Logik und schieben ihre
//! Audio-Rahmen durch die Fan-out-Engine, die Sichtbarkeits-, Filter-
//! und Distanzregeln gegen die Connection Registry auswertet.
//!
//! ## Module
//! - [`line`] – Source-Lines (offen/beschraenkt) samt Registry
//! - [`source`] – Server-Audio-Quellen und Fan-out

pub mod line;
pub mod source;

pub use line::{LineMetadaten, LineRegistry, PlayersSourceLine, SourceLine};
pub use source::{ServerAudioSource, SpielerFilter};

//! flurfunk-protocol – Wire-Format-Definitionen
//!
//! Dieses Crate definiert die binaeren Rahmen, die ueber den
//! unzuverlaessigen Transport (UDP) ausgetauscht werden. Die
//! Kontroll-Ereignisse des zuverlaessigen Kanals liegen in
//! `flurfunk-core::event`.

pub mod voice;

pub use voice::{AudioPaket, HandshakeNutzdaten};

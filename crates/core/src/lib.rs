//! rollcall-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Rollcall-Crates gemeinsam genutzt werden: die logische
//! Identitaet eines Clients (`UserId`), die fluechtige Transport-Kennung
//! (`ConnectionId`) und die Presence-Ereignisse.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, RollcallError};
pub use event::PresenceEvent;
pub use types::{ConnectionId, UserId};

//! rollcall-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Client und
//! Server ausgetauscht werden, sowie den Frame-Codec fuer TCP.

pub mod control;
pub mod wire;

pub use control::{ereignisse, ControlMessage, ControlPayload, ErrorCode, EventMessage};
pub use wire::FrameCodec;

//! rollcall-signaling – Presence- und Session-Service
//!
//! Dieser Crate verwaltet TCP-Verbindungen, ordnet jeder Verbindung per
//! Handshake eine Identitaet zu und benachrichtigt alle anderen Clients
//! wenn jemand dazukommt oder geht.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, Keepalive)
//!     |
//!     v
//! MessageDispatcher  (Handshake, Ping/Pong)
//!     |
//!     v
//! LifecycleManager   – verbunden / handshake / getrennt, PresenceEvents
//!     +-- HandshakeProtokoll – NeueSitzung oder Wiederverbunden
//!     +-- SessionRegistry    – UserId -> ConnectionId, atomar
//!     +-- EventBroadcaster   – user_connected / user_disconnected zustellen
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod lifecycle;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use handshake::{HandshakeErgebnis, HandshakeProtokoll, HandshakeZustand};
pub use lifecycle::LifecycleManager;
pub use registry::SessionRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;

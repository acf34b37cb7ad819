//! Local relay: accepts viewing status over loopback HTTP and forwards it to
//! the desktop Rich Presence client.

pub mod discord;
pub mod error;
pub mod payload;
pub mod server;

pub use error::RelayError;
pub use payload::{PresencePayload, RpcQuery};
pub use server::{router, PresenceSink, RelayState};

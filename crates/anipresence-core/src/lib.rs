//! Detects which anime a page is playing and keeps a local presence relay
//! informed, collapsing bursts of player events into single deliveries.

pub mod awaiter;
pub mod config;
pub mod delivery;
pub mod error;
pub mod extractor;
pub mod page;
pub mod service;
pub mod session;
pub mod status;

#[cfg(test)]
pub(crate) mod fakes;

pub use config::AppConfig;
pub use delivery::{DeliveryChannel, HttpTransport, Transport};
pub use error::PresenceError;
pub use page::{MutationStream, Page, Player, PlayerEvent};
pub use service::{ServiceDescriptor, ServiceKind, ServiceRegistry};
pub use session::{Observer, SessionOutcome};
pub use status::{Dispatcher, ViewingStatus};

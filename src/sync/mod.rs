//! Real-time chat synchronization layer
//!
//! Reconciles REST snapshots, locally-originated sends and socket push
//! events into one consistent view: the [`store::ChatStore`]. Commands go
//! out through [`gateway::CommandGateway`]; transport state lives in
//! [`crate::socket`].

pub mod error;
pub mod gateway;
pub mod store;
pub mod typing;

pub use error::SyncError;
pub use gateway::{CommandGateway, MESSAGES_PER_PAGE};
pub use store::{ChatStore, SeedOutcome};
pub use typing::{TypingTracker, TYPING_EXPIRY};

//! # barakholka-shared
//!
//! Types shared by the store and the HTTP server: row identifiers, the
//! `User` / `Ad` records mirrored from the identity and ad services, and
//! validated chat content.

pub mod constants;
pub mod error;
pub mod message;
pub mod types;

pub use error::ValidationError;
pub use message::MessageBody;
pub use types::{Ad, AdId, MessageId, Participant, RoomId, User, UserId};

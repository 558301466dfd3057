//! Domain models for mail entities

mod label;
mod message;

pub use label::LabelId;
pub use message::{EmailAddress, Message, MessageId, OutgoingMessage};

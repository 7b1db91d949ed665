//! Message model and wire envelope

pub mod envelope;
pub mod message;

pub use envelope::Envelope;
pub use message::{Message, MessageKind};

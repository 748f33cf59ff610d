//! BER wire codec (§4.4).

pub mod ber;
pub mod message;
pub mod pdu;

pub use message::{Message, Version};
pub use pdu::{Pdu, PduKind, Varbind};

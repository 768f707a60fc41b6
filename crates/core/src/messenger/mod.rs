//! Delivery of the final digest to a messaging endpoint.

mod digest;
mod telegram;
mod types;

pub use digest::{format_digest, format_failure_notice};
pub use telegram::TelegramMessenger;
pub use types::*;

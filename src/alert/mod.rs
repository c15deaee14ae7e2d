//! Alert model and payload decoding

pub mod parser;
pub mod types;

pub use parser::{decode, decode_bytes};
pub use types::{Alert, AlertEvent, CryType, Tier};

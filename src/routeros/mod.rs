//! RouterOS API transport: sentence framing, the command client, and
//! authenticated per-device sessions.

pub mod client;
pub mod proto;
pub mod session;

pub use client::{challenge_response, Client};
pub use proto::{Reply, Sentence};
pub use session::{ApiStream, Connector, Session, TransportOptions};

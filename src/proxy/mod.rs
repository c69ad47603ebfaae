//! Line-protocol relay
//!
//! The listener accepts client connections and runs one [`RelaySession`] per
//! connection. Sessions frame traffic with [`MessageCodec`], classify each
//! line and count it before forwarding.

pub mod codec;
pub mod message;
pub mod server;
pub mod session;

pub use codec::*;
pub use message::*;
pub use server::*;
pub use session::*;

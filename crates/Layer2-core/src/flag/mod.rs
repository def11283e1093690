//! Flag files - filesystem mailbox between the external tool and this process
//!
//! - `protocol.rs` - grammar + idempotency memory (reload nonce, profile name)
//! - `channel.rs` - polling loop, re-entrancy guard, ACK write-back

pub mod channel;
pub mod protocol;

pub use channel::{watch, ChannelHandle, FlagChannel, FlagHandler, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use protocol::{
    FlagProtocol, ProfileSwitchProtocol, ReloadProtocol, ACK_PREFIX, IDLE, RELOAD_PREFIX,
};

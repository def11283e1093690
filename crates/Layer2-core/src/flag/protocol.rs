//! Flag protocols - command grammar + idempotency memory per channel
//!
//! A flag file holds one of:
//! - `IDLE` - nothing pending (seed value)
//! - a command - grammar depends on the channel
//! - `ACK:<payload>` - last acknowledged command
//!
//! Each protocol instance is owned by exactly one channel and remembers what
//! it already honored for the lifetime of the process (not persisted).

use flagbridge_foundation::{Error, Result};
use std::fmt;

/// Inert seed value
pub const IDLE: &str = "IDLE";

/// Acknowledgement prefix
pub const ACK_PREFIX: &str = "ACK:";

/// Reload request prefix
pub const RELOAD_PREFIX: &str = "RELOAD:";

/// Grammar and memory of one flag channel
pub trait FlagProtocol: Send + 'static {
    type Command: Clone + fmt::Debug + Send + Sync + 'static;

    /// Channel name for logs
    fn name(&self) -> &'static str;

    /// Parse trimmed file content
    ///
    /// `Ok(None)` for inert content (idle marker, echoed ACK),
    /// `Err(MalformedCommand)` for anything outside the grammar.
    fn parse(&self, content: &str) -> Result<Option<Self::Command>>;

    /// Decide whether the command is new; records it when it is
    fn admit(&mut self, command: &Self::Command) -> bool;

    /// ACK content written back after handling
    fn ack(&self, command: &Self::Command) -> String;
}

fn is_inert(content: &str) -> bool {
    content.is_empty() || content == IDLE || content.starts_with(ACK_PREFIX)
}

// ============================================================================
// Reload channel - RELOAD:<nonce>
// ============================================================================

/// `RELOAD:<nonce>`; honored only when the nonce exceeds the high-water mark
#[derive(Debug, Default)]
pub struct ReloadProtocol {
    high_water: Option<u64>,
}

impl ReloadProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest nonce honored so far
    pub fn high_water(&self) -> Option<u64> {
        self.high_water
    }
}

impl FlagProtocol for ReloadProtocol {
    type Command = u64;

    fn name(&self) -> &'static str {
        "reload"
    }

    fn parse(&self, content: &str) -> Result<Option<u64>> {
        let content = content.trim();
        if is_inert(content) {
            return Ok(None);
        }
        content
            .strip_prefix(RELOAD_PREFIX)
            .map(str::trim)
            .filter(|nonce| !nonce.is_empty() && nonce.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|nonce| nonce.parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| Error::malformed(content))
    }

    fn admit(&mut self, nonce: &u64) -> bool {
        if self.high_water.map_or(true, |seen| *nonce > seen) {
            self.high_water = Some(*nonce);
            true
        } else {
            false
        }
    }

    fn ack(&self, nonce: &u64) -> String {
        format!("{}{}", ACK_PREFIX, nonce)
    }
}

// ============================================================================
// Profile-switch channel - bare profile name
// ============================================================================

/// Bare profile name; honored only when it differs from the last one acted on
#[derive(Debug, Default)]
pub struct ProfileSwitchProtocol {
    last: Option<String>,
}

impl ProfileSwitchProtocol {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagProtocol for ProfileSwitchProtocol {
    type Command = String;

    fn name(&self) -> &'static str {
        "profile-switch"
    }

    fn parse(&self, content: &str) -> Result<Option<String>> {
        let content = content.trim();
        if is_inert(content) {
            return Ok(None);
        }
        if content.lines().count() > 1 || content.chars().any(char::is_control) {
            return Err(Error::malformed(content));
        }
        Ok(Some(content.to_string()))
    }

    fn admit(&mut self, name: &String) -> bool {
        if self.last.as_deref() == Some(name.as_str()) {
            return false;
        }
        self.last = Some(name.clone());
        true
    }

    fn ack(&self, name: &String) -> String {
        format!("{}{}", ACK_PREFIX, name)
    }
}

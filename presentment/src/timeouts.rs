//! Explicit, constructor-supplied timeout configuration (§4.15): no environment variables or
//! global statics, just a typed struct with documented defaults matching §4.11.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PresentmentTimeouts {
    /// How long to wait for the reader's first message after the transport connects.
    pub first_message: Duration,
    /// How long to wait for each subsequent message in a multi-request session.
    pub subsequent_message: Duration,
}

impl PresentmentTimeouts {
    pub const fn new(first_message: Duration, subsequent_message: Duration) -> Self {
        Self { first_message, subsequent_message }
    }
}

impl Default for PresentmentTimeouts {
    fn default() -> Self {
        Self { first_message: Duration::from_secs(10), subsequent_message: Duration::from_secs(30) }
    }
}

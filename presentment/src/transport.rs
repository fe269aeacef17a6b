//! The transport abstraction the presentment loop runs over (§4.11 step 1): any bearer — BLE,
//! NFC, the in-process W3C DC API dispatch — implements this and owns its own connection
//! lifecycle.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    Failed,
    Closed,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn state(&self) -> TransportState;

    /// Resolves once the transport has left `Connecting` (into `Connected`, `Failed`, or
    /// `Closed`).
    async fn wait_until_settled(&self) -> TransportState;

    async fn receive(&self) -> Result<Vec<u8>, String>;

    async fn send(&self, message: Vec<u8>) -> Result<(), String>;

    async fn close(&self);
}

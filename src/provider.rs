//! In-page wallet provider seam
//!
//! Mirrors what an injected browser wallet exposes: connection state, the
//! public key, connect, sign-and-send, and connect/disconnect events. Events
//! are delivered over a channel instead of callbacks.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use tokio::sync::mpsc;

use crate::errors::WalletFlowResult;

/// Provider-level session events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect(Pubkey),
    Disconnect,
}

/// An injected wallet; absence of one is a normal condition
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_connected(&self) -> bool;

    fn public_key(&self) -> Option<Pubkey>;

    /// Ask the wallet to connect. Success is also announced as
    /// [`ProviderEvent::Connect`] on the subscription.
    async fn connect(&self) -> WalletFlowResult<Pubkey>;

    /// Sign and broadcast. Errors with `SignerRejected` when the user declines.
    async fn sign_and_submit(&self, tx: &Transaction) -> WalletFlowResult<Signature>;

    /// Event stream for the rest of the page lifetime
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent>;
}

//! Test Utilities Module
//!
//! Deterministic stand-ins for the ledger, the in-page wallet provider and the
//! browser navigator. No network calls; every response is scripted.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use url::Url;

use crate::errors::{WalletFlowError, WalletFlowResult};
use crate::ledger::{Ledger, SignatureState};
use crate::provider::{ProviderEvent, WalletProvider};
use crate::session::Navigator;

/// Scripted ledger
pub struct MockLedger {
    pub balance: Mutex<u64>,
    pub blockhash: Hash,
    /// Popped once per status poll; once empty, reports `Confirmed`
    pub statuses: Mutex<VecDeque<SignatureState>>,
    pub balance_error: Mutex<Option<WalletFlowError>>,
    pub balance_calls: AtomicUsize,
    pub blockhash_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub balance_queried_for: Mutex<Vec<Pubkey>>,
}

impl MockLedger {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance: Mutex::new(balance),
            blockhash: Hash::new_unique(),
            statuses: Mutex::new(VecDeque::new()),
            balance_error: Mutex::new(None),
            balance_calls: AtomicUsize::new(0),
            blockhash_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            balance_queried_for: Mutex::new(Vec::new()),
        }
    }

    /// Script the sequence of statuses returned by successive polls
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = SignatureState>) {
        self.statuses.lock().extend(statuses);
    }

    pub fn fail_balance(&self, err: WalletFlowError) {
        *self.balance_error.lock() = Some(err);
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_balance(&self, address: &Pubkey) -> WalletFlowResult<u64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balance_queried_for.lock().push(*address);
        if let Some(err) = self.balance_error.lock().clone() {
            return Err(err);
        }
        Ok(*self.balance.lock())
    }

    async fn latest_blockhash(&self) -> WalletFlowResult<Hash> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.blockhash)
    }

    async fn signature_status(&self, _signature: &Signature) -> WalletFlowResult<SignatureState> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .pop_front()
            .unwrap_or(SignatureState::Confirmed))
    }
}

/// Scripted in-page wallet
pub struct MockProvider {
    pub key: Pubkey,
    pub connected: AtomicBool,
    /// Announce connect on the event channel, like a real provider
    pub emit_connect_event: AtomicBool,
    pub connect_error: Mutex<Option<WalletFlowError>>,
    pub sign_error: Mutex<Option<WalletFlowError>>,
    pub signature: Signature,
    pub submitted: Mutex<Vec<Transaction>>,
    events: Mutex<Option<mpsc::UnboundedSender<ProviderEvent>>>,
}

impl MockProvider {
    pub fn new(key: Pubkey) -> Self {
        Self {
            key,
            connected: AtomicBool::new(false),
            emit_connect_event: AtomicBool::new(true),
            connect_error: Mutex::new(None),
            sign_error: Mutex::new(None),
            signature: Signature::from([7u8; 64]),
            submitted: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        }
    }

    pub fn already_connected(key: Pubkey) -> Self {
        let provider = Self::new(key);
        provider.connected.store(true, Ordering::SeqCst);
        provider
    }

    pub fn reject_connect(&self, message: &str) {
        *self.connect_error.lock() = Some(WalletFlowError::rejected(message));
    }

    pub fn reject_signing(&self, message: &str) {
        *self.sign_error.lock() = Some(WalletFlowError::rejected(message));
    }

    /// Push an event as if the wallet raised it
    pub fn emit(&self, event: ProviderEvent) {
        if let ProviderEvent::Disconnect = event {
            self.connected.store(false, Ordering::SeqCst);
        }
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then_some(self.key)
    }

    async fn connect(&self) -> WalletFlowResult<Pubkey> {
        if let Some(err) = self.connect_error.lock().clone() {
            return Err(err);
        }
        self.connected.store(true, Ordering::SeqCst);
        if self.emit_connect_event.load(Ordering::SeqCst) {
            self.emit(ProviderEvent::Connect(self.key));
        }
        Ok(self.key)
    }

    async fn sign_and_submit(&self, tx: &Transaction) -> WalletFlowResult<Signature> {
        if let Some(err) = self.sign_error.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push(tx.clone());
        Ok(self.signature)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock() = Some(tx);
        rx
    }
}

/// Navigator that records instead of leaving the page
#[derive(Default)]
pub struct RecordingNavigator {
    pub visited: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn last(&self) -> Option<Url> {
        self.visited.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.visited.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) -> WalletFlowResult<()> {
        self.visited.lock().push(url.clone());
        Ok(())
    }
}

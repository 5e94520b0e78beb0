//! solpay-session - Solana wallet session and payment engine
//!
//! Links a wallet to a payment page over either an in-page provider or a
//! mobile wallet deep link, plans a transfer of exactly what the user asked
//! for to the address they entered, assembles it, and submits it.
//!
//! ## Modules
//!
//! - **session**: session state machine, environment detection, deep links
//! - **allocator**: transfer planning from balance and request
//! - **tx_builder**: unsigned transaction assembly and encoding
//! - **pipeline**: submission orchestration and confirmation
//! - **ledger** / **provider**: seams to the RPC node and the wallet

pub mod allocator;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod pipeline;
pub mod provider;
pub mod session;
pub mod status;
pub mod telemetry;
pub mod tx_builder;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use allocator::{allocate, AllocationPlan, AllocationPolicy, TransferLeg};
pub use config::WalletFlowConfig;
pub use errors::{WalletFlowError, WalletFlowResult};
pub use pipeline::{SubmissionOutcome, SubmissionPipeline, TransferRequest};
pub use session::{ConnectionManager, Session, SessionState, TransportMode};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use status::{StatusEvent, StatusKind, StatusSink};
pub use tx_builder::{assemble, UnsignedTransaction};

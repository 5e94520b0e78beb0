//! Ledger RPC access
//!
//! [`Ledger`] is the seam between the pipeline and the network. [`RpcLedger`]
//! implements it over the nonblocking Solana RPC client; tests use the mock in
//! `test_utils`. Transient failures are retried with jittered backoff.

use async_trait::async_trait;
use rand::Rng;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RpcConfig;
use crate::errors::{WalletFlowError, WalletFlowResult};

/// Where a submitted signature stands on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not yet seen, or seen below the requested commitment
    Pending,
    Confirmed,
    /// Processed with an error
    Failed(String),
}

/// Ledger operations the payment flow needs
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Balance of `address` in lamports
    async fn get_balance(&self, address: &Pubkey) -> WalletFlowResult<u64>;

    /// Recent blockhash to attach to a new transaction
    async fn latest_blockhash(&self) -> WalletFlowResult<Hash>;

    /// One status lookup for `signature`; polling is the caller's job
    async fn signature_status(&self, signature: &Signature) -> WalletFlowResult<SignatureState>;
}

/// Retry configuration with jitter
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Jitter factor (0.0 to 1.0) - adds randomness to backoff
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 5000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate backoff delay for a given attempt (0-indexed)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exp_backoff = (self.base_backoff_ms as f64) * 2_f64.powi(attempt as i32);
        let capped_backoff = exp_backoff.min(self.max_backoff_ms as f64);

        let jitter_range = capped_backoff * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped_backoff + jitter).max(0.0) as u64)
    }
}

/// Retry an async ledger operation on retryable errors only
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> WalletFlowResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WalletFlowResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => {
                warn!(operation = operation_name, error = %err, "Permanent error, not retrying");
                return Err(err);
            }
            Err(err) => {
                if attempt + 1 >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = %err,
                        "All retry attempts exhausted"
                    );
                    return Err(err);
                }

                let backoff = config.calculate_backoff(attempt);
                debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient error, backing off before retry"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// [`Ledger`] over JSON-RPC
pub struct RpcLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
    retry: RetryConfig,
}

impl RpcLedger {
    pub fn new(config: &RpcConfig) -> WalletFlowResult<Self> {
        let commitment = CommitmentConfig::from_str(&config.commitment)
            .map_err(|_| WalletFlowError::Configuration(format!(
                "unknown commitment level: {}",
                config.commitment
            )))?;
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            config.timeout(),
            commitment,
        );

        Ok(Self {
            client,
            commitment,
            retry: config.retry(),
        })
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_balance(&self, address: &Pubkey) -> WalletFlowResult<u64> {
        retry_with_backoff("get_balance", &self.retry, || async move {
            self.client
                .get_balance_with_commitment(address, self.commitment)
                .await
                .map(|response| response.value)
                .map_err(WalletFlowError::from)
        })
        .await
    }

    async fn latest_blockhash(&self) -> WalletFlowResult<Hash> {
        retry_with_backoff("get_latest_blockhash", &self.retry, || async move {
            self.client
                .get_latest_blockhash_with_commitment(self.commitment)
                .await
                .map(|(blockhash, _last_valid_height)| blockhash)
                .map_err(WalletFlowError::from)
        })
        .await
    }

    async fn signature_status(&self, signature: &Signature) -> WalletFlowResult<SignatureState> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await?;

        Ok(match status {
            None => SignatureState::Pending,
            Some(Ok(())) => SignatureState::Confirmed,
            Some(Err(err)) => SignatureState::Failed(err.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_backoff_ms: 1,
            max_backoff_ms: 2,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_with_backoff("test", &fast_retry(3), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(WalletFlowError::ledger("503"))
            } else {
                Ok(42u64)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: WalletFlowResult<u64> = retry_with_backoff("test", &fast_retry(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WalletFlowError::invalid_input("bad"))
        })
        .await;

        assert!(matches!(result, Err(WalletFlowError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: WalletFlowResult<u64> = retry_with_backoff("test", &fast_retry(2), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WalletFlowError::ledger("down"))
        })
        .await;

        assert_eq!(result.unwrap_err(), WalletFlowError::ledger("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_backoff_ms: 100,
            max_backoff_ms: 400,
            jitter_factor: 0.0,
        };
        assert_eq!(config.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(config.calculate_backoff(5), Duration::from_millis(400));
    }

    #[test]
    fn test_rpc_ledger_rejects_unknown_commitment() {
        let config = RpcConfig {
            commitment: "eventually".to_string(),
            ..RpcConfig::default()
        };
        assert!(matches!(
            RpcLedger::new(&config),
            Err(WalletFlowError::Configuration(_))
        ));
    }
}

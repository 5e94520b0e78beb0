//! Submission pipeline
//!
//! balance query → plan → assemble → dispatch on the session's transport →
//! observe the outcome.
//!
//! Every failure is logged in full with the submission's correlation ID and
//! reported to the user as one generic line from
//! [`WalletFlowError::user_message`].

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::allocator::{self, format_sol_amount, parse_sol_amount, Allocation};
use crate::config::WalletFlowConfig;
use crate::errors::{WalletFlowError, WalletFlowResult};
use crate::ledger::{Ledger, SignatureState};
use crate::metrics::{metrics, Timer};
use crate::observability::{short_address, CorrelationId};
use crate::provider::WalletProvider;
use crate::session::{deeplink, ConnectionManager, Navigator, ReturnMarker, Session, TransportMode};
use crate::status::StatusSink;
use crate::tx_builder::{self, UnsignedTransaction};

/// Form input for one payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub destination: String,
    /// Display units (SOL), e.g. "1.25"
    pub amount: String,
}

impl TransferRequest {
    pub fn new(destination: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            amount: amount.into(),
        }
    }
}

/// Terminal or hand-off result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Extension path: signed, sent and confirmed
    Confirmed {
        signature: Signature,
        destination: Pubkey,
        lamports: u64,
    },
    /// Mobile path: the wallet app has the transaction; the result comes back
    /// on the next page load
    PendingRedirect {
        link: Url,
        destination: Pubkey,
        lamports: u64,
    },
}

struct ValidatedRequest {
    destination: Pubkey,
    lamports: u64,
}

pub struct SubmissionPipeline {
    ledger: Arc<dyn Ledger>,
    provider: Option<Arc<dyn WalletProvider>>,
    navigator: Arc<dyn Navigator>,
    page_url: Url,
    config: WalletFlowConfig,
    status: StatusSink,
    in_flight: AtomicBool,
}

impl SubmissionPipeline {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        provider: Option<Arc<dyn WalletProvider>>,
        navigator: Arc<dyn Navigator>,
        page_url: Url,
        config: WalletFlowConfig,
        status: StatusSink,
    ) -> Self {
        Self {
            ledger,
            provider,
            navigator,
            page_url,
            config,
            status,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Share the provider, navigator and page URL of an initialized manager
    pub fn for_manager(
        manager: &ConnectionManager,
        ledger: Arc<dyn Ledger>,
        config: WalletFlowConfig,
        status: StatusSink,
    ) -> Self {
        Self::new(
            ledger,
            manager.provider().cloned(),
            Arc::clone(manager.navigator()),
            manager.page_url().clone(),
            config,
            status,
        )
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one payment for `request` against the current session.
    ///
    /// Only one submission may run at a time; a second concurrent call fails
    /// with `SubmissionInFlight` and leaves the first untouched.
    pub async fn submit(
        &self,
        request: &TransferRequest,
        session: &Session,
    ) -> WalletFlowResult<SubmissionOutcome> {
        let correlation_id = CorrelationId::new();

        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!(correlation_id = %correlation_id, "Submission rejected, another is in flight");
            return Err(self.fail(&correlation_id, WalletFlowError::SubmissionInFlight));
        }
        let _in_flight = scopeguard::guard(&self.in_flight, |flag| {
            flag.store(false, Ordering::Release)
        });

        metrics().submissions_total.inc();
        info!(
            correlation_id = %correlation_id,
            destination = %request.destination,
            amount = %request.amount,
            mode = ?session.mode(),
            "Payment submission started"
        );

        match self.run(request, session, &correlation_id).await {
            Ok(outcome) => {
                if let SubmissionOutcome::Confirmed { .. } = outcome {
                    metrics().submissions_success.inc();
                }
                Ok(outcome)
            }
            Err(err) => Err(self.fail(&correlation_id, err)),
        }
    }

    /// Follow up a signing round trip on the page load after the wallet
    /// returns. Polls the ledger when the wallet handed back a signature.
    pub async fn confirm_returned(&self, marker: &ReturnMarker) -> WalletFlowResult<Option<Signature>> {
        let ReturnMarker::TransactionReturned { signature, .. } = marker else {
            return Ok(None);
        };
        let correlation_id = CorrelationId::new();

        let Some(signature) = signature else {
            info!(correlation_id = %correlation_id, "Mobile wallet returned without a signature");
            self.status
                .info("Transaction submitted in Phantom; awaiting network confirmation.");
            return Ok(None);
        };

        match self.await_confirmation(signature, &correlation_id).await {
            Ok(()) => {
                metrics().submissions_success.inc();
                self.status.success("Transaction completed successfully!");
                Ok(Some(*signature))
            }
            Err(err) => Err(self.fail(&correlation_id, err)),
        }
    }

    async fn run(
        &self,
        request: &TransferRequest,
        session: &Session,
        correlation_id: &CorrelationId,
    ) -> WalletFlowResult<SubmissionOutcome> {
        if !session.is_connected() {
            return Err(WalletFlowError::NotConnected);
        }
        let validated = validate_request(request)?;
        let mode = session.mode().ok_or(WalletFlowError::NotConnected)?;
        let signer = self.resolve_signer(session, mode)?;

        self.status.info("Processing payment...");
        let build_timer = Timer::new();

        let balance = self.ledger.get_balance(&signer).await?;
        debug!(correlation_id = %correlation_id, signer = %signer, balance, "Fetched balance");

        let transfer = &self.config.transfer;
        let plan = match allocator::allocate_with_policy(
            transfer.policy,
            balance,
            validated.lamports,
            validated.destination,
            transfer.fee_reserve_lamports,
        ) {
            Allocation::Plan(plan) => plan,
            Allocation::Shortfall {
                requested,
                spendable,
            } => return Err(WalletFlowError::InsufficientFunds { requested, spendable }),
        };

        let blockhash = self.ledger.latest_blockhash().await?;
        let unsigned = tx_builder::assemble(plan, signer, blockhash)?;
        build_timer.observe_duration(&metrics().build_latency);

        let lamports = unsigned.plan().total_lamports();
        if lamports < validated.lamports {
            self.status.info(format!(
                "Amount reduced to {} SOL to leave room for network fees.",
                format_sol_amount(lamports)
            ));
        }
        self.status.info(format!(
            "Sending {} SOL to {}",
            format_sol_amount(lamports),
            short_address(&validated.destination.to_string())
        ));
        info!(
            correlation_id = %correlation_id,
            signer = %signer,
            destination = %validated.destination,
            lamports,
            instructions = unsigned.instruction_count(),
            "Transaction assembled"
        );

        match mode {
            TransportMode::Extension => {
                let signature = self.dispatch_extension(&unsigned, correlation_id).await?;
                self.status.success("Transaction completed successfully!");
                Ok(SubmissionOutcome::Confirmed {
                    signature,
                    destination: validated.destination,
                    lamports,
                })
            }
            TransportMode::MobileRedirect => {
                let link = self.dispatch_redirect(&unsigned, correlation_id)?;
                Ok(SubmissionOutcome::PendingRedirect {
                    link,
                    destination: validated.destination,
                    lamports,
                })
            }
        }
    }

    fn resolve_signer(&self, session: &Session, mode: TransportMode) -> WalletFlowResult<Pubkey> {
        match mode {
            TransportMode::Extension => session
                .signer()
                .or_else(|| self.provider.as_ref().and_then(|p| p.public_key()))
                .ok_or(WalletFlowError::NotConnected),
            // Balance and planning wait until the wallet has told us who signs
            TransportMode::MobileRedirect => session.signer().ok_or(WalletFlowError::SignerUnresolved),
        }
    }

    async fn dispatch_extension(
        &self,
        unsigned: &UnsignedTransaction,
        correlation_id: &CorrelationId,
    ) -> WalletFlowResult<Signature> {
        let provider = self.provider.as_ref().ok_or(WalletFlowError::ProviderNotFound)?;

        self.status.info("Approving transaction in Phantom...");
        let signature = provider.sign_and_submit(unsigned.transaction()).await?;
        info!(correlation_id = %correlation_id, signature = %signature, "Transaction submitted");

        self.status.info("Waiting for network confirmation...");
        self.await_confirmation(&signature, correlation_id).await?;
        Ok(signature)
    }

    fn dispatch_redirect(
        &self,
        unsigned: &UnsignedTransaction,
        correlation_id: &CorrelationId,
    ) -> WalletFlowResult<Url> {
        let payload = unsigned.to_base58()?;
        let link = deeplink::sign_link(&self.config.deeplink, &self.page_url, &payload)?;

        self.status.info("Opening Phantom to sign transaction...");
        metrics().redirects_started.inc();
        info!(
            correlation_id = %correlation_id,
            payload_len = payload.len(),
            "Handing transaction to mobile wallet"
        );
        self.navigator.navigate(&link)?;
        Ok(link)
    }

    /// Poll the signature status until confirmed, failed, or past the
    /// configured deadline
    async fn await_confirmation(
        &self,
        signature: &Signature,
        correlation_id: &CorrelationId,
    ) -> WalletFlowResult<()> {
        let started = Instant::now();
        let timer = Timer::new();
        let poll_interval = self.config.confirmation.poll_interval();
        let deadline = self.config.confirmation.timeout();
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            match self.ledger.signature_status(signature).await? {
                SignatureState::Confirmed => {
                    timer.observe_duration(&metrics().confirmation_latency);
                    info!(
                        correlation_id = %correlation_id,
                        signature = %signature,
                        polls,
                        latency_ms = timer.elapsed_ms(),
                        "Transaction confirmed"
                    );
                    return Ok(());
                }
                SignatureState::Failed(reason) => {
                    return Err(WalletFlowError::TransactionFailed(reason));
                }
                SignatureState::Pending => {}
            }

            if let Some(limit) = deadline {
                let waited = started.elapsed();
                if waited + poll_interval > limit {
                    return Err(WalletFlowError::ConfirmationTimeout {
                        signature: signature.to_string(),
                        waited_ms: waited.as_millis() as u64,
                    });
                }
            }
            sleep(poll_interval.max(Duration::from_millis(1))).await;
        }
    }

    /// Log the raw error and tell the user the generic version
    fn fail(&self, correlation_id: &CorrelationId, err: WalletFlowError) -> WalletFlowError {
        error!(
            correlation_id = %correlation_id,
            category = err.category(),
            retryable = err.is_retryable(),
            error = %err,
            "Payment submission failed"
        );
        metrics().record_failure(err.category());
        self.status.failure(err.user_message());
        err
    }
}

fn validate_request(request: &TransferRequest) -> WalletFlowResult<ValidatedRequest> {
    let destination = request.destination.trim();
    if destination.is_empty() || request.amount.trim().is_empty() {
        return Err(WalletFlowError::invalid_input("please fill all fields"));
    }

    let destination = Pubkey::from_str(destination).map_err(|_| {
        WalletFlowError::invalid_input("recipient is not a valid Solana address")
    })?;

    let lamports = parse_sol_amount(&request.amount)?;
    if lamports == 0 {
        return Err(WalletFlowError::invalid_input("amount must be greater than zero"));
    }

    Ok(ValidatedRequest {
        destination,
        lamports,
    })
}

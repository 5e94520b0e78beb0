//! Error taxonomy for the wallet session and payment flow
//!
//! Every failure that can reach the submission boundary is one of these
//! variants. Raw detail is kept in the variant for operator logs; the end
//! user only ever sees [`WalletFlowError::user_message`].

use thiserror::Error;

/// Errors produced by the connection manager, allocator, assembler,
/// ledger client and submission pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletFlowError {
    /// No in-page wallet provider and the client is not mobile
    #[error("Wallet provider not found")]
    ProviderNotFound,

    /// Submission attempted while the session is not connected
    #[error("Session is not connected")]
    NotConnected,

    /// Malformed destination address or missing/unparseable amount
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// RPC transport or response failure
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The user or the provider declined connect or signing
    #[error("Signer rejected: {0}")]
    SignerRejected(String),

    /// Mobile session whose signer address is not known yet
    #[error("Signer identity not resolved for mobile session")]
    SignerUnresolved,

    /// The allocation produced no legs
    #[error("Allocation plan is empty")]
    EmptyPlan,

    /// Exact policy only: the request exceeds what the balance can cover
    #[error("Insufficient funds: requested {requested} lamports, spendable {spendable}")]
    InsufficientFunds {
        requested: u64,
        spendable: u64,
    },

    /// Confirmation polling exceeded the configured deadline
    #[error("Confirmation timed out after {waited_ms}ms (signature: {signature})")]
    ConfirmationTimeout {
        signature: String,
        waited_ms: u64,
    },

    /// The ledger processed the transaction and reported an error
    #[error("Transaction failed on ledger: {0}")]
    TransactionFailed(String),

    /// A submission is already running for this pipeline
    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transaction or deep-link encoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type WalletFlowResult<T> = Result<T, WalletFlowError>;

impl WalletFlowError {
    /// Whether the user can fix this themselves before retrying
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound | Self::InvalidInput(_) | Self::InsufficientFunds { .. }
        )
    }

    /// Whether retrying the same operation might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LedgerUnavailable(_) => true,
            Self::ConfirmationTimeout { .. } => true,

            Self::ProviderNotFound => false,
            Self::NotConnected => false,
            Self::InvalidInput(_) => false,
            Self::SignerRejected(_) => false,
            Self::SignerUnresolved => false,
            Self::EmptyPlan => false,
            Self::InsufficientFunds { .. } => false,
            Self::TransactionFailed(_) => false,
            Self::SubmissionInFlight => false,
            Self::Configuration(_) => false,
            Self::Serialization(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::ProviderNotFound => "provider",
            Self::NotConnected => "session",
            Self::InvalidInput(_) => "input",
            Self::LedgerUnavailable(_) => "ledger",
            Self::SignerRejected(_) => "signer",
            Self::SignerUnresolved => "session",
            Self::EmptyPlan => "allocation",
            Self::InsufficientFunds { .. } => "allocation",
            Self::ConfirmationTimeout { .. } => "confirmation",
            Self::TransactionFailed(_) => "ledger",
            Self::SubmissionInFlight => "pipeline",
            Self::Configuration(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Single-line status text for the end user.
    ///
    /// Only actionable errors say what went wrong; everything else gets a
    /// generic retry message.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderNotFound => {
                "Phantom wallet not detected. Please install the Phantom extension.".to_string()
            }
            Self::NotConnected => "Please connect your wallet first.".to_string(),
            Self::InvalidInput(reason) => format!("Please check the form: {}", reason),
            Self::SignerUnresolved => {
                "Wallet address unknown. Please reconnect your wallet.".to_string()
            }
            Self::InsufficientFunds { .. } => {
                "Amount exceeds your available balance after network fees.".to_string()
            }
            Self::EmptyPlan => "Nothing to send: the amount is zero after fees.".to_string(),
            Self::SubmissionInFlight => "A payment is already being processed.".to_string(),
            _ => "Transaction failed. Please try again.".to_string(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn ledger(reason: impl Into<String>) -> Self {
        Self::LedgerUnavailable(reason.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::SignerRejected(reason.into())
    }
}

impl From<solana_client::client_error::ClientError> for WalletFlowError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}

impl From<bincode::Error> for WalletFlowError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for WalletFlowError {
    fn from(err: url::ParseError) -> Self {
        Self::Serialization(format!("invalid url: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalletFlowError::InsufficientFunds {
            requested: 10,
            spendable: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: requested 10 lamports, spendable 4"
        );
        assert_eq!(
            WalletFlowError::ledger("connection refused").to_string(),
            "Ledger unavailable: connection refused"
        );
    }

    #[test]
    fn test_only_actionable_errors_are_specific() {
        assert!(WalletFlowError::ProviderNotFound.is_user_actionable());
        assert!(WalletFlowError::invalid_input("bad address").is_user_actionable());
        assert!(!WalletFlowError::ledger("503").is_user_actionable());
        assert!(!WalletFlowError::rejected("User rejected").is_user_actionable());

        // Internal detail never leaks into user text
        let msg = WalletFlowError::ledger("node 10.0.0.3 returned 503").user_message();
        assert_eq!(msg, "Transaction failed. Please try again.");
        let msg = WalletFlowError::rejected("User rejected the request").user_message();
        assert!(!msg.contains("User rejected"));
    }

    #[test]
    fn test_error_retryability() {
        assert!(WalletFlowError::ledger("timeout").is_retryable());
        assert!(WalletFlowError::ConfirmationTimeout {
            signature: "sig".to_string(),
            waited_ms: 1000
        }
        .is_retryable());
        assert!(!WalletFlowError::EmptyPlan.is_retryable());
        assert!(!WalletFlowError::NotConnected.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(WalletFlowError::EmptyPlan.category(), "allocation");
        assert_eq!(WalletFlowError::ledger("x").category(), "ledger");
        assert_eq!(WalletFlowError::ProviderNotFound.category(), "provider");
    }

    #[test]
    fn test_user_message_is_single_line() {
        let all = [
            WalletFlowError::ProviderNotFound,
            WalletFlowError::NotConnected,
            WalletFlowError::invalid_input("missing amount"),
            WalletFlowError::ledger("x\ny"),
            WalletFlowError::rejected("x"),
            WalletFlowError::SignerUnresolved,
            WalletFlowError::EmptyPlan,
            WalletFlowError::SubmissionInFlight,
        ];
        for err in all {
            assert!(!err.user_message().contains('\n'), "{:?}", err);
        }
    }
}

//! Submission pipeline over the extension transport

#[cfg(test)]
mod pipeline_tests {
    use solana_sdk::{
        pubkey::Pubkey, system_instruction::SystemInstruction,
        system_program, transaction::Transaction,
    };
    use std::sync::atomic::Ordering;

    use crate::allocator::AllocationPolicy;
    use crate::config::WalletFlowConfig;
    use crate::errors::WalletFlowError;
    use crate::ledger::SignatureState;
    use crate::pipeline::{SubmissionOutcome, TransferRequest};
    use crate::session::{Session, SessionState, TransportMode};
    use crate::status::StatusKind;
    use crate::tests::test_helpers::{connected_provider, fast_config, Harness, DESKTOP, PAGE};

    const TWO_SOL: u64 = 2_000_000_000;
    const ONE_SOL: u64 = 1_000_000_000;

    /// (from, to, lamports) for every instruction, failing on anything that is
    /// not a plain system transfer
    fn decode_transfers(tx: &Transaction) -> Vec<(Pubkey, Pubkey, u64)> {
        let keys = &tx.message.account_keys;
        tx.message
            .instructions
            .iter()
            .map(|ix| {
                assert_eq!(keys[ix.program_id_index as usize], system_program::id());
                let lamports = match bincode::deserialize::<SystemInstruction>(&ix.data).unwrap() {
                    SystemInstruction::Transfer { lamports } => lamports,
                    other => panic!("unexpected system instruction {:?}", other),
                };
                (
                    keys[ix.accounts[0] as usize],
                    keys[ix.accounts[1] as usize],
                    lamports,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_requested_amount_goes_to_entered_destination() {
        let (signer, provider) = connected_provider();
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());
        let destination = Pubkey::new_unique();

        let outcome = h
            .pipeline
            .submit(
                &TransferRequest::new(destination.to_string(), "1.0"),
                h.manager.session(),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Confirmed {
                signature: provider.signature,
                destination,
                lamports: ONE_SOL,
            }
        );

        let submitted = provider.submitted.lock();
        assert_eq!(submitted.len(), 1);
        let tx = &submitted[0];
        assert_eq!(tx.message.account_keys[0], signer);
        assert_eq!(tx.message.recent_blockhash, h.ledger.blockhash);
        // One leg, to the address the user typed, for what the user typed
        assert_eq!(decode_transfers(tx), vec![(signer, destination, ONE_SOL)]);
        assert_eq!(*h.ledger.balance_queried_for.lock(), vec![signer]);

        let events = h.drain_status();
        let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages[0], "Processing payment...");
        assert!(messages.iter().any(|m| m.starts_with("Sending 1 SOL to ")));
        assert!(!messages.iter().any(|m| m.starts_with("Amount reduced")));
        let last = events.last().unwrap();
        assert_eq!(last.kind, StatusKind::Success);
        assert_eq!(last.message, "Transaction completed successfully!");
        assert!(!h.pipeline.is_in_flight());
    }

    #[tokio::test]
    async fn test_request_above_spendable_is_clamped_not_redirected() {
        let (signer, provider) = connected_provider();
        let reserve = WalletFlowConfig::default().transfer.fee_reserve_lamports;
        let balance = ONE_SOL + reserve;
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), balance, fast_config());
        let destination = Pubkey::new_unique();

        let outcome = h
            .pipeline
            .submit(
                &TransferRequest::new(destination.to_string(), "5"),
                h.manager.session(),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Confirmed { lamports: ONE_SOL, .. }
        ));
        let submitted = provider.submitted.lock();
        assert_eq!(decode_transfers(&submitted[0]), vec![(signer, destination, ONE_SOL)]);
        assert!(h
            .drain_status()
            .iter()
            .any(|e| e.message == "Amount reduced to 1 SOL to leave room for network fees."));
    }

    #[tokio::test]
    async fn test_exact_policy_refuses_shortfall() {
        let (_, provider) = connected_provider();
        let mut config = fast_config();
        config.transfer.policy = AllocationPolicy::Exact;
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), ONE_SOL, config);

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            WalletFlowError::InsufficientFunds {
                requested: ONE_SOL,
                spendable: ONE_SOL - 5_000,
            }
        );
        assert!(provider.submitted.lock().is_empty());
        assert_eq!(h.ledger.blockhash_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.drain_status().pop().unwrap().message,
            "Amount exceeds your available balance after network fees."
        );
    }

    #[tokio::test]
    async fn test_balance_within_fee_reserve_yields_empty_plan() {
        let (_, provider) = connected_provider();
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), 5_000, fast_config());

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "0.5"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, WalletFlowError::EmptyPlan);
        assert!(provider.submitted.lock().is_empty());
        assert_eq!(h.drain_status().pop().unwrap().kind, StatusKind::Failure);
    }

    #[tokio::test]
    async fn test_submit_requires_connected_session() {
        let (_, provider) = connected_provider();
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                &Session::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, WalletFlowError::NotConnected);
        assert_eq!(h.ledger.balance_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.drain_status().pop().unwrap().message,
            "Please connect your wallet first."
        );
    }

    #[tokio::test]
    async fn test_form_validation() {
        let (_, provider) = connected_provider();
        let h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());
        let destination = Pubkey::new_unique().to_string();

        let cases = [
            (TransferRequest::new("", "1"), "please fill all fields"),
            (TransferRequest::new(destination.as_str(), "  "), "please fill all fields"),
            (
                TransferRequest::new("not-an-address", "1"),
                "recipient is not a valid Solana address",
            ),
            (
                TransferRequest::new(destination.as_str(), "0"),
                "amount must be greater than zero",
            ),
        ];

        for (request, reason) in cases {
            let err = h
                .pipeline
                .submit(&request, h.manager.session())
                .await
                .unwrap_err();
            assert_eq!(err, WalletFlowError::invalid_input(reason), "{:?}", request);
        }

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(destination.as_str(), "abc"),
                h.manager.session(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletFlowError::InvalidInput(_)));

        assert_eq!(h.ledger.balance_calls.load(Ordering::SeqCst), 0);
        assert!(provider.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_signing_rejection_reports_generic_failure() {
        let (_, provider) = connected_provider();
        provider.reject_signing("User rejected the request.");
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WalletFlowError::SignerRejected(_)));
        let last = h.drain_status().pop().unwrap();
        assert_eq!(last.kind, StatusKind::Failure);
        assert_eq!(last.message, "Transaction failed. Please try again.");
        assert!(!h.pipeline.is_in_flight());
        // Session survives a declined signature
        assert_eq!(h.manager.session().state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_ledger_outage_fails_before_signing() {
        let (_, provider) = connected_provider();
        let mut h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());
        h.ledger.fail_balance(WalletFlowError::ledger("connection refused"));

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, WalletFlowError::ledger("connection refused"));
        assert!(provider.submitted.lock().is_empty());
        assert_eq!(
            h.drain_status().pop().unwrap().message,
            "Transaction failed. Please try again."
        );
    }

    #[tokio::test]
    async fn test_failed_signature_status_is_transaction_failed() {
        let (_, provider) = connected_provider();
        let h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());
        h.ledger.script_statuses([
            SignatureState::Pending,
            SignatureState::Failed("InstructionError(0, Custom(1))".to_string()),
        ]);

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            WalletFlowError::TransactionFailed("InstructionError(0, Custom(1))".to_string())
        );
        assert_eq!(h.ledger.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout() {
        let (_, provider) = connected_provider();
        let mut config = WalletFlowConfig::default();
        config.confirmation.timeout_secs = Some(2);
        let h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, config);
        h.ledger
            .script_statuses(std::iter::repeat(SignatureState::Pending).take(1_000));

        let err = h
            .pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "1"),
                h.manager.session(),
            )
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        match err {
            WalletFlowError::ConfirmationTimeout {
                signature,
                waited_ms,
            } => {
                assert_eq!(signature, provider.signature.to_string());
                assert!(waited_ms <= 2_000);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(!h.pipeline.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_rejected_while_first_in_flight() {
        let (_, provider) = connected_provider();
        let h = Harness::new(
            DESKTOP,
            PAGE,
            Some(provider.clone()),
            TWO_SOL,
            WalletFlowConfig::default(),
        );
        // Keep the first submission parked in confirmation polling
        h.ledger
            .script_statuses([SignatureState::Pending, SignatureState::Pending]);
        let request = TransferRequest::new(Pubkey::new_unique().to_string(), "1");

        let (first, second) = tokio::join!(
            h.pipeline.submit(&request, h.manager.session()),
            h.pipeline.submit(&request, h.manager.session()),
        );

        assert!(matches!(first, Ok(SubmissionOutcome::Confirmed { .. })));
        assert_eq!(second.unwrap_err(), WalletFlowError::SubmissionInFlight);
        assert_eq!(provider.submitted.lock().len(), 1);
        assert!(!h.pipeline.is_in_flight());

        // Guard released, the next one goes through
        h.pipeline
            .submit(&request, h.manager.session())
            .await
            .unwrap();
        assert_eq!(provider.submitted.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_session_signer_used_for_balance() {
        let (provider_key, provider) = connected_provider();
        let h = Harness::new(DESKTOP, PAGE, Some(provider.clone()), TWO_SOL, fast_config());
        let restored = Pubkey::new_unique();
        let session = Session::with_state(
            SessionState::Connected,
            Some(TransportMode::Extension),
            Some(restored),
        );

        h.pipeline
            .submit(
                &TransferRequest::new(Pubkey::new_unique().to_string(), "0.25"),
                &session,
            )
            .await
            .unwrap();

        let queried = h.ledger.balance_queried_for.lock().clone();
        assert_eq!(queried, vec![restored]);
        assert_ne!(queried[0], provider_key);
    }
}

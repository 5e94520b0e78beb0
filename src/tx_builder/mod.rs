//! Transaction assembly for transfer plans
//!
//! - **instructions**: one System Program transfer per plan leg, plus an
//!   ordering check compiled into debug/test builds only
//! - **output**: the immutable [`UnsignedTransaction`] and its wire encoding
//!
//! Assembly is pure. Whether the fee payer can actually cover the legs is
//! only known when the ledger processes the transaction.

mod instructions;
mod output;

pub use instructions::{plan_transfer_instructions, sanity_check_transfer_order};
pub use output::UnsignedTransaction;

use solana_sdk::{hash::Hash, message::Message, pubkey::Pubkey, transaction::Transaction};

use crate::allocator::AllocationPlan;
use crate::errors::WalletFlowResult;

/// Build the unsigned transaction for `plan`, paid for by `fee_payer`.
///
/// Fails with `EmptyPlan` when the plan has no legs.
pub fn assemble(
    plan: AllocationPlan,
    fee_payer: Pubkey,
    recent_blockhash: Hash,
) -> WalletFlowResult<UnsignedTransaction> {
    let instructions = plan_transfer_instructions(&plan, &fee_payer)?;
    sanity_check_transfer_order(&instructions, &plan, &fee_payer)?;

    let message = Message::new_with_blockhash(&instructions, Some(&fee_payer), &recent_blockhash);
    let tx = Transaction::new_unsigned(message);

    Ok(UnsignedTransaction::new(plan, fee_payer, recent_blockhash, tx))
}

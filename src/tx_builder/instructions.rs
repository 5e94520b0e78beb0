//! Transfer instruction planning and ordering validation
//!
//! One System Program transfer per plan leg, in plan order. The ledger
//! executes instructions sequentially within a transaction, so the order here
//! is the execution order.

use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, system_instruction, system_program,
};

use crate::allocator::AllocationPlan;
use crate::errors::{WalletFlowError, WalletFlowResult};

/// System Program `Transfer` discriminator (u32 little-endian)
const TRANSFER_DISCRIMINATOR: [u8; 4] = [2, 0, 0, 0];

/// Build the ordered transfer instructions for `plan`, debited from `from`
pub fn plan_transfer_instructions(
    plan: &AllocationPlan,
    from: &Pubkey,
) -> WalletFlowResult<Vec<Instruction>> {
    if plan.is_empty() {
        return Err(WalletFlowError::EmptyPlan);
    }

    Ok(plan
        .legs()
        .iter()
        .map(|leg| system_instruction::transfer(from, &leg.destination, leg.lamports))
        .collect())
}

/// Validate that `instructions` are exactly the transfers of `plan` (debug/test only)
///
/// Checks, per position:
/// 1. System Program transfer
/// 2. Debited from `from`
/// 3. Credited to the leg's destination with the leg's amount
#[cfg(debug_assertions)]
pub fn sanity_check_transfer_order(
    instructions: &[Instruction],
    plan: &AllocationPlan,
    from: &Pubkey,
) -> WalletFlowResult<()> {
    if instructions.len() != plan.legs().len() {
        return Err(WalletFlowError::Serialization(format!(
            "instruction count {} does not match plan legs {}",
            instructions.len(),
            plan.legs().len()
        )));
    }

    for (idx, (ix, leg)) in instructions.iter().zip(plan.legs()).enumerate() {
        if ix.program_id != system_program::id() || ix.data.len() < 12 || ix.data[..4] != TRANSFER_DISCRIMINATOR {
            return Err(WalletFlowError::Serialization(format!(
                "instruction {} is not a system transfer",
                idx
            )));
        }

        let mut amount = [0u8; 8];
        amount.copy_from_slice(&ix.data[4..12]);
        let lamports = u64::from_le_bytes(amount);

        let accounts_match = ix.accounts.len() == 2
            && ix.accounts[0].pubkey == *from
            && ix.accounts[1].pubkey == leg.destination;
        if !accounts_match || lamports != leg.lamports {
            return Err(WalletFlowError::Serialization(format!(
                "instruction {} does not match leg to {} for {} lamports",
                idx, leg.destination, leg.lamports
            )));
        }
    }

    Ok(())
}

/// No-op version of sanity_check_transfer_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_transfer_order(
    _instructions: &[Instruction],
    _plan: &AllocationPlan,
    _from: &Pubkey,
) -> WalletFlowResult<()> {
    Ok(())
}

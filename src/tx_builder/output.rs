//! Assembled, unsigned transfer transaction
//!
//! Holds the legacy `Transaction` with empty signature slots. Nothing mutates
//! it after assembly; transports receive it by reference.

use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::Transaction};

use crate::allocator::AllocationPlan;
use crate::errors::WalletFlowResult;

/// Unsigned transaction built from an allocation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    plan: AllocationPlan,
    fee_payer: Pubkey,
    recent_blockhash: Hash,
    tx: Transaction,
}

impl UnsignedTransaction {
    pub(crate) fn new(
        plan: AllocationPlan,
        fee_payer: Pubkey,
        recent_blockhash: Hash,
        tx: Transaction,
    ) -> Self {
        Self {
            plan,
            fee_payer,
            recent_blockhash,
            tx,
        }
    }

    pub fn plan(&self) -> &AllocationPlan {
        &self.plan
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn recent_blockhash(&self) -> &Hash {
        &self.recent_blockhash
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn instruction_count(&self) -> usize {
        self.tx.message.instructions.len()
    }

    /// Wire bytes with unsigned signature slots left as defaults
    pub fn serialize(&self) -> WalletFlowResult<Vec<u8>> {
        Ok(bincode::serialize(&self.tx)?)
    }

    /// Base58 of [`Self::serialize`], for embedding in a deep link path
    pub fn to_base58(&self) -> WalletFlowResult<String> {
        Ok(bs58::encode(self.serialize()?).into_string())
    }
}

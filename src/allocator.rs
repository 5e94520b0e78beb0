//! Transfer planning from the current balance
//!
//! The plan pays the user-supplied destination the user-requested amount and
//! nothing else. The only adjustment is the network fee reserve: the amount is
//! clamped to `balance - fee_reserve` under [`AllocationPolicy::Clamp`], or
//! reported as a shortfall under [`AllocationPolicy::Exact`].

use serde::{Deserialize, Serialize};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

use crate::errors::{WalletFlowError, WalletFlowResult};

/// Decimal places of the native token display unit
const SOL_DECIMALS: usize = 9;

/// One (destination, amount) pair of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLeg {
    pub destination: Pubkey,
    pub lamports: u64,
}

/// Ordered legs for a single submission. Empty when nothing can be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    legs: Vec<TransferLeg>,
}

impl AllocationPlan {
    pub fn legs(&self) -> &[TransferLeg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn total_lamports(&self) -> u64 {
        self.legs.iter().map(|leg| leg.lamports).sum()
    }
}

/// How a request larger than the spendable balance is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Send `min(requested, spendable)`
    #[default]
    Clamp,
    /// Refuse to send less than requested
    Exact,
}

/// Result of planning under a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Plan(AllocationPlan),
    Shortfall { requested: u64, spendable: u64 },
}

/// Plan a transfer of `requested_lamports` to `destination`.
///
/// Total and pure: the single leg never exceeds `balance - fee_reserve`, and a
/// zero amount yields an empty plan.
pub fn allocate(
    balance_lamports: u64,
    requested_lamports: u64,
    destination: Pubkey,
    fee_reserve_lamports: u64,
) -> AllocationPlan {
    let spendable = balance_lamports.saturating_sub(fee_reserve_lamports);
    let amount = requested_lamports.min(spendable);

    let mut legs = Vec::with_capacity(1);
    if amount > 0 {
        legs.push(TransferLeg {
            destination,
            lamports: amount,
        });
    }
    AllocationPlan { legs }
}

/// [`allocate`] with the shortfall check of [`AllocationPolicy::Exact`]
pub fn allocate_with_policy(
    policy: AllocationPolicy,
    balance_lamports: u64,
    requested_lamports: u64,
    destination: Pubkey,
    fee_reserve_lamports: u64,
) -> Allocation {
    let spendable = balance_lamports.saturating_sub(fee_reserve_lamports);
    if policy == AllocationPolicy::Exact && requested_lamports > spendable {
        return Allocation::Shortfall {
            requested: requested_lamports,
            spendable,
        };
    }
    Allocation::Plan(allocate(
        balance_lamports,
        requested_lamports,
        destination,
        fee_reserve_lamports,
    ))
}

/// Parse a display-unit amount ("1.5", "0.001", "2") into lamports without
/// going through floating point.
pub fn parse_sol_amount(input: &str) -> WalletFlowResult<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WalletFlowError::invalid_input("amount is required"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(WalletFlowError::invalid_input("amount must be a positive number"));
    }
    if fraction.len() > SOL_DECIMALS {
        return Err(WalletFlowError::invalid_input(
            "amount has more than 9 decimal places",
        ));
    }

    let whole_lamports = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(LAMPORTS_PER_SOL))
            .ok_or_else(|| WalletFlowError::invalid_input("amount is too large"))?
    };

    let fraction_lamports = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = SOL_DECIMALS);
        padded
            .parse::<u64>()
            .map_err(|_| WalletFlowError::invalid_input("amount must be a positive number"))?
    };

    whole_lamports
        .checked_add(fraction_lamports)
        .ok_or_else(|| WalletFlowError::invalid_input("amount is too large"))
}

/// Render lamports as a display-unit string with trailing zeros trimmed
pub fn format_sol_amount(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let fraction = lamports % LAMPORTS_PER_SOL;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = SOL_DECIMALS);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

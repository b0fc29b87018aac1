// Fee splitting for escrow releases
//
// Amounts are raw token units (6 decimals for the settlement token) carried
// as base-10 strings and split with arbitrary precision integers.

use num_bigint::BigUint;

use crate::error::SettlementError;

/// Platform share of every settlement, in percent
pub const PLATFORM_FEE_PERCENT: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub platform_fee_raw: BigUint,
    pub specialist_amount_raw: BigUint,
}

impl SplitResult {
    pub fn total(&self) -> BigUint {
        &self.platform_fee_raw + &self.specialist_amount_raw
    }
}

/// Parse a raw amount literal. Only ASCII digits are accepted: no sign,
/// no exponent, no separators.
pub fn parse_raw_amount(amount_raw: &str) -> Result<BigUint, SettlementError> {
    if amount_raw.is_empty() || !amount_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SettlementError::InvalidAmount(amount_raw.to_string()));
    }

    BigUint::parse_bytes(amount_raw.as_bytes(), 10)
        .ok_or_else(|| SettlementError::InvalidAmount(amount_raw.to_string()))
}

/// Split a raw amount into platform fee and specialist payout.
///
/// The fee is `floor(amount * 15 / 100)`; the remainder of the division
/// always lands on the specialist side.
pub fn split(amount_raw: &str) -> Result<SplitResult, SettlementError> {
    let amount = parse_raw_amount(amount_raw)?;
    Ok(split_amount(&amount))
}

pub fn split_amount(amount: &BigUint) -> SplitResult {
    let platform_fee_raw = amount * PLATFORM_FEE_PERCENT / 100u32;
    let specialist_amount_raw = amount - &platform_fee_raw;

    SplitResult {
        platform_fee_raw,
        specialist_amount_raw,
    }
}

//! # Money — Integer Minor Units
//!
//! Amounts are carried as integer minor units (whole rupiah). Floats are
//! never used for money: the downpayment split is integer arithmetic
//! with an explicit floor rule, so the downpayment plus the remainder
//! always reconstructs the total exactly.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Downpayment share of the total amount, in percent.
///
/// A scheduled booking is confirmed by paying this share up front; the
/// remainder is due as the final payment.
pub const DOWNPAYMENT_PERCENT: u64 = 30;

/// A monetary amount in integer minor units.
///
/// Non-negative by construction. Arithmetic is checked — overflow is a
/// construction error, never a silent wrap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Create an amount from minor units.
    pub fn from_minor(units: u64) -> Self {
        Self(units)
    }

    /// The amount in minor units.
    pub fn minor(&self) -> u64 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Money) -> Result<Money, CoreError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOverflow)
    }

    /// The downpayment share of this amount: [`DOWNPAYMENT_PERCENT`]% of
    /// the total, floored to whole minor units.
    pub fn downpayment(&self) -> Money {
        Money(self.0 * DOWNPAYMENT_PERCENT / 100)
    }

    /// The final-payment share: whatever the downpayment floor left over.
    ///
    /// `downpayment() + final_payment() == total`, always.
    pub fn final_payment(&self) -> Money {
        Money(self.0 - self.downpayment().0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downpayment_is_thirty_percent() {
        assert_eq!(Money::from_minor(1_000_000).downpayment().minor(), 300_000);
    }

    #[test]
    fn downpayment_floors() {
        // 30% of 101 = 30.3 → 30
        assert_eq!(Money::from_minor(101).downpayment().minor(), 30);
    }

    #[test]
    fn split_reconstructs_total() {
        for total in [0u64, 1, 99, 101, 333, 1_000_000, 7_777_777] {
            let m = Money::from_minor(total);
            assert_eq!(
                m.downpayment().minor() + m.final_payment().minor(),
                total,
                "split must be lossless for {total}"
            );
        }
    }

    #[test]
    fn checked_add_overflow() {
        let max = Money::from_minor(u64::MAX);
        assert!(max.checked_add(Money::from_minor(1)).is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let m = Money::from_minor(250_000);
        assert_eq!(serde_json::to_string(&m).unwrap(), "250000");
    }
}

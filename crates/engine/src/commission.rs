//! Commission calculator.
//!
//! Pure integer arithmetic, no I/O: given a gross sale amount and the
//! product's commission and platform-fee terms, compute what the affiliate
//! earns and what the platform keeps. Percentage math always floors, never
//! rounds up, so the platform never under-collects its fee; fixed amounts
//! are capped at their base so a payout can never exceed the sale price.
//!
//! The calculator never moves money. Order fulfillment feeds its result to
//! the ledger (see `Engine::fulfill_order`).

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Percentage,
    Fixed,
}

impl RateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl TryFrom<&str> for RateKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(EngineError::Validation(format!(
                "invalid rate kind: {other}"
            ))),
        }
    }
}

/// Either a percentage (0..=100) or a fixed amount in minor units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTerms {
    pub kind: RateKind,
    pub value: i64,
}

impl RateTerms {
    #[must_use]
    pub fn percentage(value: i64) -> Self {
        Self {
            kind: RateKind::Percentage,
            value,
        }
    }

    #[must_use]
    pub fn fixed(value: i64) -> Self {
        Self {
            kind: RateKind::Fixed,
            value,
        }
    }

    /// Applies the terms to a base amount.
    ///
    /// Percentages floor; fixed amounts are capped at the base.
    fn applied_to(self, base_minor: i64) -> ResultEngine<i64> {
        match self.kind {
            RateKind::Percentage => {
                if !(0..=100).contains(&self.value) {
                    return Err(EngineError::Validation(format!(
                        "percentage must be within 0..=100, got {}",
                        self.value
                    )));
                }
                Ok(((i128::from(base_minor) * i128::from(self.value)) / 100) as i64)
            }
            RateKind::Fixed => {
                if self.value < 0 {
                    return Err(EngineError::Validation(format!(
                        "fixed amount must be >= 0, got {}",
                        self.value
                    )));
                }
                Ok(self.value.min(base_minor))
            }
        }
    }
}

/// The immutable result of pricing one fulfilled order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub gross_commission_minor: i64,
    pub platform_fee_minor: i64,
    pub net_commission_minor: i64,
}

/// Computes the commission breakdown for a fulfilled order.
///
/// The platform fee is computed against the gross commission, not the gross
/// sale amount, and the net payout is floored at zero.
pub fn compute(
    gross_amount_minor: i64,
    commission: RateTerms,
    platform_fee: RateTerms,
) -> ResultEngine<CommissionBreakdown> {
    if gross_amount_minor < 0 {
        return Err(EngineError::Validation(format!(
            "gross_amount_minor must be >= 0, got {gross_amount_minor}"
        )));
    }

    let gross_commission_minor = commission.applied_to(gross_amount_minor)?;
    let platform_fee_minor = platform_fee.applied_to(gross_commission_minor)?;
    let net_commission_minor = (gross_commission_minor - platform_fee_minor).max(0);

    Ok(CommissionBreakdown {
        gross_commission_minor,
        platform_fee_minor,
        net_commission_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_commission_and_fee() {
        // 15% of 5000 = 750, 10% fee on 750 = 75, net 675.
        let breakdown = compute(
            5_000,
            RateTerms::percentage(15),
            RateTerms::percentage(10),
        )
        .unwrap();
        assert_eq!(breakdown.gross_commission_minor, 750);
        assert_eq!(breakdown.platform_fee_minor, 75);
        assert_eq!(breakdown.net_commission_minor, 675);
    }

    #[test]
    fn percentage_math_floors() {
        let breakdown = compute(
            999,
            RateTerms::percentage(15),
            RateTerms::percentage(10),
        )
        .unwrap();
        assert_eq!(breakdown.gross_commission_minor, 149);
        assert_eq!(breakdown.platform_fee_minor, 14);
        assert_eq!(breakdown.net_commission_minor, 135);
    }

    #[test]
    fn fixed_commission_capped_at_gross() {
        let breakdown = compute(5_000, RateTerms::fixed(9_000), RateTerms::percentage(0)).unwrap();
        assert_eq!(breakdown.gross_commission_minor, 5_000);
        assert_eq!(breakdown.net_commission_minor, 5_000);
    }

    #[test]
    fn fixed_fee_capped_at_commission() {
        let breakdown = compute(5_000, RateTerms::fixed(200), RateTerms::fixed(1_000)).unwrap();
        assert_eq!(breakdown.gross_commission_minor, 200);
        assert_eq!(breakdown.platform_fee_minor, 200);
        assert_eq!(breakdown.net_commission_minor, 0);
    }

    #[test]
    fn net_never_negative_and_commission_never_exceeds_gross() {
        for gross in [0i64, 1, 99, 5_000, 1_000_000] {
            for pct in [0i64, 1, 15, 50, 100] {
                for fee_pct in [0i64, 10, 100] {
                    let b = compute(
                        gross,
                        RateTerms::percentage(pct),
                        RateTerms::percentage(fee_pct),
                    )
                    .unwrap();
                    assert!(b.net_commission_minor >= 0);
                    assert!(b.gross_commission_minor <= gross);
                    assert_eq!(
                        b.net_commission_minor,
                        b.gross_commission_minor - b.platform_fee_minor
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_out_of_range_terms() {
        assert!(compute(100, RateTerms::percentage(101), RateTerms::percentage(0)).is_err());
        assert!(compute(100, RateTerms::percentage(-1), RateTerms::percentage(0)).is_err());
        assert!(compute(100, RateTerms::fixed(-5), RateTerms::percentage(0)).is_err());
        assert!(compute(-1, RateTerms::percentage(10), RateTerms::percentage(0)).is_err());
    }
}

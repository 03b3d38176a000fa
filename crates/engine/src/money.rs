/// Signed money amount represented as **integer minor units** (KES cents).
///
/// The ledger stores raw `i64` minor units and never formats or scales;
/// this wrapper exists for the percentage math settlement shares need.
/// Display formatting belongs to whatever UI consumes the API.
///
/// The value is signed:
/// - positive = credit / increase
/// - negative = debit / decrease
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Floor-percentage share: `amount * pct / 100` truncated toward zero.
    ///
    /// The ledger always floors percentage math so the platform never
    /// over-pays a share; any truncation remainder is allocated explicitly
    /// by the caller (see escrow `split`).
    #[must_use]
    pub fn percent_floor(self, pct: u8) -> MoneyCents {
        let share = (i128::from(self.0) * i128::from(pct)) / 100;
        MoneyCents(share as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floor_truncates() {
        assert_eq!(MoneyCents::new(10_000).percent_floor(30).cents(), 3000);
        assert_eq!(MoneyCents::new(999).percent_floor(10).cents(), 99);
        assert_eq!(MoneyCents::new(1).percent_floor(50).cents(), 0);
        assert_eq!(MoneyCents::new(10_000).percent_floor(0).cents(), 0);
        assert_eq!(MoneyCents::new(10_000).percent_floor(100).cents(), 10_000);
    }

    #[test]
    fn percent_floor_shares_partition_the_amount() {
        for amount in [1, 99, 9_999, 123_457] {
            for pct in 0..=100u8 {
                let refund = MoneyCents::new(amount).percent_floor(pct).cents();
                let payee = amount - refund;
                assert!(refund >= 0);
                assert!(payee >= 0);
                assert_eq!(refund + payee, amount);
            }
        }
    }
}

use crate::uint::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A non-negative, transferable balance. Arithmetic never wraps: additions
/// saturate the 256-bit range and subtractions are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::zero());

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn new(value: U256) -> Self {
        Amount(value)
    }

    pub fn from_u64(value: u64) -> Self {
        Amount(U256::from(value))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn less(&self, other: &Amount) -> bool {
        self.0 < other.0
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Amount(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_ordering() {
        let a = Amount::from_u64(5);
        let b = Amount::from_u64(7);
        assert!(a.less(&b));
        assert!(!b.less(&a));
        assert!(!a.less(&a));
    }

    #[test]
    fn test_amount_sub() {
        let a = Amount::from_u64(7);
        let b = Amount::from_u64(5);
        assert_eq!(a.checked_sub(&b), Some(Amount::from_u64(2)));
        assert_eq!(b.checked_sub(&a), None);
    }

    #[test]
    fn test_amount_add() {
        assert_eq!(
            Amount::from_u64(3) + Amount::from_u64(4),
            Amount::from_u64(7)
        );
    }
}

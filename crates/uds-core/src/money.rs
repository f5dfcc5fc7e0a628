//! # Money Amounts
//!
//! Integer minor-unit amounts. Floats never appear in persisted values —
//! amounts are exact or they are wrong.

use serde::{Deserialize, Serialize};

/// A monetary amount in minor units (e.g. cents, paise).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a minor-unit value.
    pub fn from_minor_units(value: u64) -> Self {
        Self(value)
    }

    /// The minor-unit value.
    pub fn minor_units(&self) -> u64 {
        self.0
    }

    /// Saturating addition. Order totals never wrap.
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_is_transparent_integer() {
        let a = Amount::from_minor_units(125_000);
        assert_eq!(serde_json::to_string(&a).unwrap(), "125000");
        let back: Amount = serde_json::from_str("125000").unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn amount_rejects_floats() {
        assert!(serde_json::from_str::<Amount>("125.50").is_err());
    }

    #[test]
    fn saturating_add_never_wraps() {
        let max = Amount::from_minor_units(u64::MAX);
        assert_eq!(max.saturating_add(Amount::from_minor_units(1)), max);
    }
}

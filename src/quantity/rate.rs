use std::fmt::{Debug, Display, Formatter};

use ordered_float::OrderedFloat;

/// Price per kilowatt-hour in the market currency.
#[repr(transparent)]
#[derive(
    Clone,
    Copy,
    PartialEq,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
    derive_more::From,
    serde::Deserialize,
    serde::Serialize,
)]
#[must_use]
pub struct KilowattHourRate(pub f64);

impl KilowattHourRate {
    pub const ZERO: Self = Self(0.0);
}

impl Display for KilowattHourRate {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{:.5}/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Eq for KilowattHourRate {}

impl PartialOrd for KilowattHourRate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KilowattHourRate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        OrderedFloat(self.0).cmp(&OrderedFloat(other.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_total() {
        let mut rates = vec![KilowattHourRate(0.5), KilowattHourRate(-0.1), KilowattHourRate(0.0)];
        rates.sort();
        assert_eq!(rates[0], KilowattHourRate(-0.1));
        assert_eq!(rates[2], KilowattHourRate(0.5));
    }
}

use chrono::DateTime;
use chrono_tz::Tz;

use crate::quantity::rate::KilowattHourRate;

/// One hour of the day-ahead price series.
///
/// `starts_at` is aligned to the start of the hour in the configured zone;
/// the price covers `[starts_at, starts_at + 1h)`.
// No `Deserialize`: a bare timestamp cannot recover its `Tz`, so incoming
// payloads deserialize their own wire structs and construct points with an
// explicit zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Constructor, serde::Serialize)]
#[must_use]
pub struct PricePoint {
    pub starts_at: DateTime<Tz>,
    pub price: KilowattHourRate,
}

/// Ordered hourly price series, ascending by `starts_at`.
///
/// Treated as an immutable snapshot per evaluation and replaced wholesale on
/// update. Around DST transitions a day may have 23 or 25 points, so nothing
/// here assumes exactly 24 points per day.
pub type PriceSeries = Vec<PricePoint>;

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::Oslo;

    use super::*;

    #[test]
    fn test_serializes_with_zone_offset() {
        let point = PricePoint::new(
            Oslo.with_ymd_and_hms(2019, 1, 21, 5, 0, 0).unwrap(),
            KilowattHourRate(0.52078),
        );
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("2019-01-21T05:00:00+01:00"), "{json}");
        assert!(json.contains("0.52078"), "{json}");
    }
}

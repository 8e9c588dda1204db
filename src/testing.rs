//! Shared test fixtures.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::{Europe::Oslo, Tz};

use crate::{
    core::point::{PricePoint, PriceSeries},
    quantity::rate::KilowattHourRate,
};

/// Routes tracing output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 48 hourly prices covering two Oslo days, starting 2019-01-21 00:00 local
/// (2019-01-20 23:00 UTC). The second day repeats the first.
pub fn two_day_series() -> PriceSeries {
    const DAY: [f64; 24] = [
        0.49599, 0.49103, 0.48919, 0.48987, 0.4955, 0.52078, 0.53604, 0.60264, 0.63073, 0.60176,
        0.56754, 0.55704, 0.55344, 0.55315, 0.55772, 0.56385, 0.58008, 0.59671, 0.57979, 0.54868,
        0.53634, 0.53264, 0.52185, 0.50902,
    ];
    let first = Utc.with_ymd_and_hms(2019, 1, 20, 23, 0, 0).unwrap().with_timezone(&Oslo);
    DAY.iter()
        .chain(&DAY)
        .enumerate()
        .map(|(index, price)| {
            PricePoint::new(
                first + TimeDelta::hours(index as i64),
                KilowattHourRate(*price),
            )
        })
        .collect()
}

/// An instant within the fixture range, by UTC clock.
pub fn at_utc(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    Utc.with_ymd_and_hms(2019, 1, day, hour, minute, 0).unwrap().with_timezone(&Oslo)
}

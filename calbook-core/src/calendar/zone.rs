//! Timezone handling for wall-clock event times.

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CalbookError, CalbookResult};

/// How far back to look for the offset in force before a DST gap.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Parse an IANA zone name such as `America/New_York`.
pub fn parse_zone(name: &str) -> CalbookResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CalbookError::Validation(format!("Invalid timezone: {}", name)))
}

/// The instant a wall-clock time in `zone` refers to.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant.
/// Nonexistent times (clocks going forward) use the offset in force before
/// the gap, which is the same instant as the wall clock pushed forward by the
/// length of the gap.
pub fn to_instant(local: NaiveDateTime, zone: Tz) -> CalbookResult<DateTime<Utc>> {
    if let Some(resolved) = zone.from_local_datetime(&local).earliest() {
        return Ok(resolved.with_timezone(&Utc));
    }

    let before_gap = zone
        .from_local_datetime(&(local - Duration::hours(GAP_LOOKBACK_HOURS)))
        .earliest()
        .ok_or_else(|| {
            CalbookError::Validation(format!("Cannot resolve {} in {}", local, zone.name()))
        })?;
    let offset = i64::from(before_gap.offset().fix().local_minus_utc());

    Ok((local - Duration::seconds(offset)).and_utc())
}

/// Re-express a wall-clock time in `from` as the wall-clock time in `to`
/// showing the same instant.
pub fn reinterpret(local: NaiveDateTime, from: Tz, to: Tz) -> CalbookResult<NaiveDateTime> {
    Ok(to_instant(local, from)?.with_timezone(&to).naive_local())
}

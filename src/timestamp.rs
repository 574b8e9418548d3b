//! C3: timestamp formatter.
//!
//! Per SPEC_FULL.md §9.7, this formats `"<epoch> <±HHMM>"` with the offset
//! looked up in an in-process IANA zone database (`chrono-tz`) instead of
//! mutating the process `TZ` environment variable. This keeps the output
//! contract (P9) while removing the global-mutable-state hazard §5
//! describes for the `TZ`-based design.

use crate::error::ExportError;
use crate::model::RCS_EPOCH;
use chrono::TimeZone as _;
use std::str::FromStr as _;

/// Formats `epoch_seconds` (UTC) under the named IANA zone as
/// `"<epoch_seconds> <±HHMM>"`. Falls back to `UTC` if `zone` is empty or
/// unrecognized, matching the "missing author record" recovery path (§7).
pub fn format_timestamp(epoch_seconds: i64, zone: &str) -> Result<String, ExportError> {
    let tz = resolve_zone(zone)?;
    let utc = chrono::DateTime::from_timestamp(epoch_seconds, 0)
        .expect("epoch_seconds must be a valid Unix timestamp");
    let local = utc.with_timezone(&tz);
    Ok(format!("{epoch_seconds} {}", local.format("%z")))
}

fn resolve_zone(zone: &str) -> Result<chrono_tz::Tz, ExportError> {
    if zone.is_empty() {
        return Ok(chrono_tz::UTC);
    }
    chrono_tz::Tz::from_str(zone).map_err(|_| ExportError::UnknownTimezone(zone.to_owned()))
}

/// §4.6 `display_date`: the epoch seconds a commit record is stamped with.
/// `force_dates` substitutes a synthetic, strictly increasing value derived
/// from the commit's own mark so that two exports of the same history
/// produce byte-identical, monotonically ordered timestamps even when the
/// underlying CVS dates are out of order or missing entirely.
pub fn display_date(commit_date: i64, mark: u64, force_dates: bool, commit_time_window: i64) -> i64 {
    if force_dates {
        100_000 + (mark as i64) * commit_time_window * 2
    } else {
        commit_date + RCS_EPOCH
    }
}

//! Fixed textual timestamp form used by every report output.
//!
//! All timestamps render as `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC, regardless of
//! the formatter consuming them.

use chrono::{DateTime, Utc};
use serde::Serializer;

/// strftime pattern for report timestamps.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp in the fixed report form.
pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// serde `serialize_with` adapter for `DateTime<Utc>`.
pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

/// serde `serialize_with` adapter for `Option<DateTime<Utc>>`.
pub fn serialize_option<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serializer.serialize_some(&format(ts)),
        None => serializer.serialize_none(),
    }
}

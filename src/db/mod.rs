pub mod connection;
pub mod repositories;

pub use connection::{create_pool, verify_connection};
pub use repositories::*;

use chrono::NaiveDateTime;

/// Timestamp rendering used for every row returned to the HTTP layer.
pub(crate) fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn fmt_ts_opt(ts: Option<NaiveDateTime>) -> String {
    ts.map(fmt_ts).unwrap_or_default()
}

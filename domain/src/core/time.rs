//! Millisecond timestamps

/// Unix epoch milliseconds (UTC)
pub type Timestamp = i64;

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

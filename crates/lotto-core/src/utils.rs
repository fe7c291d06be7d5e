use chrono::Utc;

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for persisted state and logs).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Seconds since the Unix epoch, used as a cache-busting query value.
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

// ============== Text Helpers ==============

/// Truncate to at most `max_len` characters, appending `...` when cut.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len).collect();
    out.push_str("...");
    out
}

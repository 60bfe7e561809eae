//! Wall-clock timestamp helper shared by key generation and challenge
//! creation; both stamp records with the current Unix time in seconds.

/// Current Unix timestamp in whole seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

//! Small helpers shared by the transport and message types

use rand::Rng;
use std::time::Duration;

/// Upper bound (inclusive) of [`generate_random_number`]
pub const RANDOM_NUMBER_MAX: u32 = 10_000_000;

/// Suspend the calling task for at least `duration_ms` milliseconds
///
/// Only the calling task is suspended; the runtime keeps driving other tasks.
pub async fn sleep(duration_ms: u64) {
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Generate a random integer in `[0, 10_000_000]`
///
/// Not suitable for anything security related; used for short-lived
/// correlation ids.
pub fn generate_random_number() -> u32 {
    rand::thread_rng().gen_range(0..=RANDOM_NUMBER_MAX)
}

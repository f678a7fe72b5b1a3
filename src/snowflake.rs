use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Relay epoch: 2025-01-01T00:00:00Z
const EPOCH: u64 = 1_735_689_600_000;

/// Last id handed out: `(ms since EPOCH) << 22 | sequence`.
static LAST_ID: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH)
}

/// Process-unique, monotonically increasing id used for connections and
/// persisted gesture records.
pub fn generate() -> String {
    let now = now_ms().saturating_sub(EPOCH) << 22;
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        // Sequence overflow borrows from the next millisecond.
        let next = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}

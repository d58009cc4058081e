use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic per-process component folded into generated ids so that two
/// reporters created in the same nanosecond still diverge.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate an opaque session identifier.
///
/// Not cryptographic, just unique enough that two browsing contexts observed
/// in isolation practically never collide, which is the only requirement.
/// One id is held for a reporter's whole lifetime and never reused across
/// page loads.
pub fn generate_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let hash = timestamp
        .wrapping_mul(6364136223846793005)
        .wrapping_add(pid as u128)
        .wrapping_add((seq as u128) << 64);
    format!("{:016x}-{:08x}", hash as u64, (hash >> 64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert_eq!(id.len(), 25);
        assert_eq!(id.chars().nth(16), Some('-'));
        assert!(id
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == '-'));
    }

    #[test]
    fn test_consecutive_ids_differ() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_many_ids_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_session_id()));
        }
    }
}

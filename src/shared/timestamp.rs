/// 订单时间戳
///
/// Orders are stamped in milliseconds since the Unix epoch. Two orders
/// submitted from the same node within one millisecond would otherwise tie
/// and fall back to arrival order on every peer, which differs between
/// peers. `MonotonicClock` hands out strictly increasing values instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 当前毫秒时间戳（无缓存）
#[inline]
pub fn get_precise_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Strictly increasing millisecond clock, shared by all submissions of a node
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock milliseconds, bumped past the previous value when needed
    pub fn now(&self) -> u64 {
        let wall = get_precise_timestamp();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_precise_timestamp_is_millis() {
        let ts = get_precise_timestamp();
        // 2020-01-01 之后，且不是纳秒
        assert!(ts > 1_577_836_800_000);
        assert!(ts < 1_577_836_800_000_000);
    }

    #[test]
    fn test_clock_strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_clock_unique_across_threads() {
        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || (0..500).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}

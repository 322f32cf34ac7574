use std::f64::consts::E;
use std::time::Duration;

/// Delay used for every attempt past the thirteenth.
pub const BACKOFF_CAP: Duration = Duration::from_secs(120);

const BASE_MICROS: f64 = 100_000.0;
const LAST_UNCAPPED_ATTEMPT: u32 = 13;

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// The delay grows as `100ms * attempt^e`, which reaches roughly 106s at
/// the thirteenth attempt; beyond that it is pinned to [`BACKOFF_CAP`].
///
/// ```
/// use std::time::Duration;
/// use packmirror_fetch::{BACKOFF_CAP, backoff_delay};
///
/// assert_eq!(backoff_delay(1), Duration::from_millis(100));
/// assert!(backoff_delay(2) > backoff_delay(1));
/// assert_eq!(backoff_delay(14), BACKOFF_CAP);
/// ```
pub fn backoff_delay(attempt: u32) -> Duration {
    if attempt > LAST_UNCAPPED_ATTEMPT {
        return BACKOFF_CAP;
    }
    let micros = BASE_MICROS * f64::from(attempt).powf(E);
    Duration::from_micros(micros as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_first_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_follows_power_of_e() {
        // 2^e ~ 6.5809
        let second = backoff_delay(2);
        assert!(second > Duration::from_millis(658));
        assert!(second < Duration::from_millis(659));

        // 13^e ~ 1063.6
        let thirteenth = backoff_delay(13);
        assert!(thirteenth > Duration::from_secs(106));
        assert!(thirteenth < BACKOFF_CAP);
    }

    #[test]
    fn test_backoff_strictly_increasing_until_cap() {
        let delays: Vec<Duration> = (1..=13).map(backoff_delay).collect();
        for pair in delays.windows(2) {
            assert!(pair[1] > pair[0], "{:?} should exceed {:?}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_backoff_capped_after_thirteen() {
        for attempt in [14, 15, 50, 1_000, u32::MAX] {
            assert_eq!(backoff_delay(attempt), BACKOFF_CAP);
        }
    }

    #[test]
    fn test_backoff_zero_attempt() {
        assert_eq!(backoff_delay(0), Duration::ZERO);
    }
}

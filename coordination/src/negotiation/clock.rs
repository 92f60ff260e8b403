//! Descending price clock for the timed auction.
//!
//! The server never ticks the price. Every observer evaluates
//! `max(0, start - floor(elapsed_seconds) * drop)` against the shared start
//! time, so all clients agree on the price at any instant.

use chrono::{DateTime, Utc};

/// Price after `elapsed_seconds` whole or partial seconds.
pub fn price_after(start_price: u64, drop_per_second: u64, elapsed_seconds: f64) -> u64 {
    let whole = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        elapsed_seconds.floor() as u64
    } else {
        0
    };
    start_price.saturating_sub(whole.saturating_mul(drop_per_second))
}

/// Price at wall-clock `at` for an auction started at `started_at`.
///
/// Times before the start read as the start price.
pub fn price_at(
    start_price: u64,
    drop_per_second: u64,
    started_at: DateTime<Utc>,
    at: DateTime<Utc>,
) -> u64 {
    let elapsed_ms = (at - started_at).num_milliseconds();
    price_after(start_price, drop_per_second, elapsed_ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ten_seconds() {
        assert_eq!(price_after(5_000_000, 25_000, 10.0), 4_750_000);
    }

    #[test]
    fn test_partial_seconds_floor() {
        assert_eq!(price_after(5_000_000, 25_000, 0.999), 5_000_000);
        assert_eq!(price_after(5_000_000, 25_000, 1.0), 4_975_000);
        assert_eq!(price_after(5_000_000, 25_000, 10.7), 4_750_000);
    }

    #[test]
    fn test_clamps_to_zero() {
        assert_eq!(price_after(5_000_000, 25_000, 200.0), 0);
        assert_eq!(price_after(5_000_000, 25_000, 10_000.0), 0);
        assert_eq!(price_after(5_000_000, u64::MAX, 3.0), 0);
    }

    #[test]
    fn test_negative_elapsed_is_start_price() {
        assert_eq!(price_after(5_000_000, 25_000, -4.0), 5_000_000);
        assert_eq!(price_after(5_000_000, 25_000, f64::NAN), 5_000_000);
    }

    #[test]
    fn test_price_at_agrees_with_price_after() {
        let start = Utc::now();
        for ms in (0..30_000i64).step_by(250) {
            let at = start + Duration::milliseconds(ms);
            assert_eq!(
                price_at(5_000_000, 25_000, start, at),
                price_after(5_000_000, 25_000, ms as f64 / 1000.0),
                "diverged at {ms}ms"
            );
        }
    }

    #[test]
    fn test_price_at_wall_clock() {
        let start = Utc::now();
        assert_eq!(price_at(5_000_000, 25_000, start, start), 5_000_000);
        assert_eq!(
            price_at(5_000_000, 25_000, start, start + Duration::seconds(10)),
            4_750_000
        );
        assert_eq!(
            price_at(5_000_000, 25_000, start, start + Duration::milliseconds(10_900)),
            4_750_000
        );
        assert_eq!(
            price_at(5_000_000, 25_000, start, start - Duration::seconds(3)),
            5_000_000
        );
        assert_eq!(
            price_at(5_000_000, 25_000, start, start + Duration::seconds(600)),
            0
        );
    }

    #[test]
    fn test_observers_converge() {
        let start = Utc::now();
        let at = start + Duration::milliseconds(7_250);
        let a = price_at(3_000_000, 50_000, start, at);
        let b = price_after(3_000_000, 50_000, 7.25);
        assert_eq!(a, b);
        assert_eq!(a, 2_650_000);
    }
}

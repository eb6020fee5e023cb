//! Clock abstraction and identifier-suffix helpers.

use rand::Rng;

/// Trait for providing the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time as milliseconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Clock implementation that returns the real system time.
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis() as i64
    }
}

/// Produces a uniform random decimal suffix of exactly `n` digits.
///
/// Zero-padded to width `n` so identifiers that embed the suffix keep
/// ordering consistent under the store's lexicographic key comparison.
pub(crate) fn digits(n: u32) -> String {
    let bound = 10u64.pow(n);
    let value = rand::rng().random_range(0..bound);
    format!("{value:0width$}", width = n as usize)
}

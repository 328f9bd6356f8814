//! Exponential backoff with symmetric jitter.

use rand::Rng;
use std::time::Duration;

use crate::policy::RetryPolicy;

/// Fraction of the wait that jitter may add or remove.
pub const JITTER_RATIO: f64 = 0.25;

/// No computed wait is ever shorter than this.
pub const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Wait before retrying after the given (1-indexed) failed attempt.
///
/// Uses the thread-local random source for jitter.
pub fn compute_backoff(attempt: u32, policy: &RetryPolicy) -> Duration {
    compute_backoff_with(attempt, policy, &mut rand::rng())
}

/// Same as [`compute_backoff`] with an explicit random source.
pub fn compute_backoff_with<R: Rng>(
    attempt: u32,
    policy: &RetryPolicy,
    rng: &mut R,
) -> Duration {
    let mut secs = base_backoff(attempt, policy).as_secs_f64();

    if policy.jitter_enabled && secs > 0.0 {
        let spread = secs * JITTER_RATIO;
        secs += rng.random_range(-spread..=spread);
    }

    Duration::try_from_secs_f64(secs.max(MIN_BACKOFF.as_secs_f64())).unwrap_or(policy.max_wait)
}

/// `initial_wait * exponential_base^(attempt - 1)`, capped at `max_wait`, without jitter or floor.
pub fn base_backoff(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponent = attempt.max(1) - 1;
    let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
    let scaled = policy.initial_wait.as_secs_f64() * policy.exponential_base.powi(exponent);
    let max_secs = policy.max_wait.as_secs_f64();

    if scaled.is_finite() && scaled < max_secs {
        Duration::from_secs_f64(scaled.max(0.0))
    } else {
        policy.max_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_wait(Duration::from_secs(1))
            .with_max_wait(Duration::from_secs(30))
            .with_jitter(false)
    }

    #[test]
    fn test_exponential_growth() {
        let policy = no_jitter();
        assert_eq!(compute_backoff(1, &policy), Duration::from_secs(1));
        assert_eq!(compute_backoff(2, &policy), Duration::from_secs(2));
        assert_eq!(compute_backoff(3, &policy), Duration::from_secs(4));
        assert_eq!(compute_backoff(5, &policy), Duration::from_secs(16));
    }

    #[test]
    fn test_capped_at_max_wait() {
        let policy = no_jitter();
        assert_eq!(compute_backoff(6, &policy), Duration::from_secs(30));
        assert_eq!(compute_backoff(60, &policy), Duration::from_secs(30));
        assert_eq!(compute_backoff(u32::MAX, &policy), Duration::from_secs(30));
    }

    #[test]
    fn test_attempt_zero_behaves_like_first_attempt() {
        let policy = no_jitter();
        assert_eq!(compute_backoff(0, &policy), compute_backoff(1, &policy));
    }

    #[test]
    fn test_floor_applies() {
        let policy = no_jitter()
            .with_initial_wait(Duration::from_millis(10))
            .with_max_wait(Duration::from_millis(50));
        assert_eq!(compute_backoff(1, &policy), MIN_BACKOFF);
        assert_eq!(compute_backoff(4, &policy), MIN_BACKOFF);
    }

    #[test]
    fn test_huge_max_wait_never_panics() {
        let policy = RetryPolicy::default()
            .with_initial_wait(Duration::from_secs(1))
            .with_max_wait(Duration::from_secs_f64(1.8e19));
        let mut rng = StdRng::seed_from_u64(3);
        for attempt in [1, 64, 200, u32::MAX] {
            for _ in 0..50 {
                let wait = compute_backoff_with(attempt, &policy, &mut rng);
                assert!(wait >= MIN_BACKOFF);
            }
        }
    }

    #[test]
    fn test_jitter_is_deterministic_for_a_seed() {
        let policy = RetryPolicy::judge();
        let a = compute_backoff_with(2, &policy, &mut StdRng::seed_from_u64(7));
        let b = compute_backoff_with(2, &policy, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = RetryPolicy::database();
        let mut rng = StdRng::seed_from_u64(42);
        for attempt in 1..=8 {
            let base = base_backoff(attempt, &policy).as_secs_f64();
            for _ in 0..50 {
                let wait = compute_backoff_with(attempt, &policy, &mut rng).as_secs_f64();
                assert!(wait >= (base * 0.75).max(0.1) - 1e-6, "{wait} below range of {base}");
                assert!(wait <= (base * 1.25).max(0.1) + 1e-6, "{wait} above range of {base}");
            }
        }
    }
}

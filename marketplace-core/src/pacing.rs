//! Sequential execution with a fixed pause between calls.

use std::future::Future;
use std::time::Duration;

/// Pause after image deletions.
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_millis(200);
/// Pause between image uploads.
pub const DEFAULT_UPLOAD_DELAY: Duration = Duration::from_millis(500);
/// Pause before re-reading the item once images are reconciled.
pub const DEFAULT_REFETCH_DELAY: Duration = Duration::from_millis(1000);

/// Delays the sync workflow inserts between backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub between_deletions: Duration,
    pub between_uploads: Duration,
    pub before_refetch: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            between_deletions: DEFAULT_DELETE_DELAY,
            between_uploads: DEFAULT_UPLOAD_DELAY,
            before_refetch: DEFAULT_REFETCH_DELAY,
        }
    }
}

impl PacingPolicy {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            between_deletions: Duration::ZERO,
            between_uploads: Duration::ZERO,
            before_refetch: Duration::ZERO,
        }
    }
}

/// Sleeps for `delay`, skipping the timer entirely when it is zero.
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Runs `call` for each item, one at a time and in order, pausing for `delay`
/// between consecutive calls. Each call's output is collected; a failing call
/// does not stop the remaining ones.
pub async fn paced<I, F, Fut>(items: I, delay: Duration, mut call: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    let mut outputs = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            pause(delay).await;
        }
        outputs.push(call(item).await);
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_paced_runs_in_order_with_gaps() {
        let started = Instant::now();
        let seen = Mutex::new(Vec::new());

        let outputs = paced(["a", "b", "c"], Duration::from_millis(500), |item| {
            seen.lock().unwrap().push((item, started.elapsed()));
            async move { item.to_uppercase() }
        })
        .await;

        assert_eq!(outputs, vec!["A", "B", "C"]);
        let seen = seen.into_inner().unwrap();
        let order: Vec<&str> = seen.iter().map(|(item, _)| *item).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(seen[0].1 < Duration::from_millis(1));
        assert!(seen[1].1 >= Duration::from_millis(500) && seen[1].1 < Duration::from_millis(510));
        assert!(seen[2].1 >= Duration::from_millis(1000) && seen[2].1 < Duration::from_millis(1020));
        // No trailing pause after the last call.
        assert!(started.elapsed() < Duration::from_millis(1020));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_continues_after_failure() {
        let outputs: Vec<Result<u32, String>> = paced(1..=3, Duration::from_millis(10), |n| async move {
            if n == 2 {
                Err(format!("failed {}", n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(outputs, vec![Ok(1), Err("failed 2".to_string()), Ok(3)]);
    }

    #[tokio::test]
    async fn test_paced_empty_input() {
        let outputs = paced(Vec::<u8>::new(), Duration::from_secs(60), |n| async move { n }).await;
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_default_policy() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.between_deletions, Duration::from_millis(200));
        assert_eq!(policy.between_uploads, Duration::from_millis(500));
        assert_eq!(policy.before_refetch, Duration::from_millis(1000));
        assert!(PacingPolicy::none().before_refetch.is_zero());
    }
}

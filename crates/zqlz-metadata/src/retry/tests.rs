//! Tests for the retry module

use super::*;
use crate::error::MetadataError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use zqlz_core::{TaskMonitor, VoidProgressMonitor, ZqlzError};

fn connectivity() -> MetadataError {
    MetadataError::Connectivity(ZqlzError::Connection("reset by peer".into()))
}

fn query_failure() -> MetadataError {
    MetadataError::Query {
        kind: "partitions",
        parent: "SCOTT.SALES".into(),
        source: ZqlzError::Query("ORA-01031: insufficient privileges".into()),
    }
}

mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_exponential_growth() {
        let backoff = BackoffStrategy::new(100, 30_000);
        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_capped() {
        let backoff = BackoffStrategy::new(100, 1000);
        assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(3.0);
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(900));
    }

    #[test]
    fn test_backoff_jitter_stays_within_quarter() {
        let backoff = BackoffStrategy::new(1000, 30_000).with_jitter(true);
        for _ in 0..50 {
            let delay = backoff.calculate_delay(0);
            assert!(
                delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250),
                "delay {:?} outside 750..=1250ms",
                delay
            );
        }
    }

    #[test]
    fn test_backoff_bounds_are_normalised() {
        let backoff = BackoffStrategy::new(0, 0).with_multiplier(0.5);
        assert_eq!(backoff.initial_delay(), Duration::from_millis(1));
        assert_eq!(backoff.max_delay(), Duration::from_millis(1));
        assert_eq!(backoff.multiplier(), 1.0);
        assert!(!backoff.has_jitter());
    }
}

mod policy_tests {
    use super::*;

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, BackoffStrategy::default()).max_attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, BackoffStrategy::new(10, 100));

        let result = retry_with_policy(
            &policy,
            &VoidProgressMonitor,
            MetadataError::is_transient,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(connectivity())
                    } else {
                        Ok(attempt)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_attempts_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, BackoffStrategy::new(10, 100));

        let result: Result<(), _> = retry_with_policy(
            &policy,
            &VoidProgressMonitor,
            MetadataError::is_transient,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connectivity()) }
            },
        )
        .await;

        assert!(matches!(result, Err(MetadataError::Connectivity(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, BackoffStrategy::new(10, 100));

        let result: Result<(), _> = retry_with_policy(
            &policy,
            &VoidProgressMonitor,
            MetadataError::is_transient,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(query_failure()) }
            },
        )
        .await;

        assert!(matches!(result, Err(MetadataError::Query { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_before_first_attempt() {
        let monitor = TaskMonitor::new();
        monitor.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_policy(
            &RetryPolicy::default(),
            &monitor,
            MetadataError::is_transient,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert!(matches!(result, Err(MetadataError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let monitor = TaskMonitor::new();
        let calls = AtomicU32::new(0);
        // Long backoff: only cancellation can end the sleep in time.
        let policy = RetryPolicy::new(10, BackoffStrategy::new(60_000, 60_000));

        let result: Result<(), _> = retry_with_policy(
            &policy,
            &monitor,
            MetadataError::is_transient,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                monitor.cancel();
                async { Err(connectivity()) }
            },
        )
        .await;

        assert!(matches!(result, Err(MetadataError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

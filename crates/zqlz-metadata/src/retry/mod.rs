//! Bounded retry for metadata loads
//!
//! The lazy caches never retry on their own: a failed fetch leaves them
//! unloaded and hands the error back. Callers that want another go wrap the
//! load in [`retry_with_policy`].
//!
//! ```ignore
//! let policy = RetryPolicy::new(3, BackoffStrategy::new(100, 2_000).with_jitter(true));
//! let partitions = retry_with_policy(&policy, &monitor, MetadataError::is_transient, |_| {
//!     table.partitions(conn.as_ref(), &monitor)
//! })
//! .await?;
//! ```

mod backoff;
mod policy;

#[cfg(test)]
mod tests;

pub use backoff::BackoffStrategy;
pub use policy::{RetryPolicy, retry_with_policy};

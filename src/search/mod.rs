//! Concurrent search pipeline: filters, bounded retry, per-member
//! enumeration, and the multi-member fan-out coordinator.

mod coordinator;
mod enumerator;
mod filter;
mod retry;

pub use coordinator::{
    Coordinator, CoordinatorError, DEFAULT_CONCURRENCY, DEFAULT_MEMBER_TIMEOUT, SearchReport,
    SearchStats,
};
pub use enumerator::{EnumerationOutcome, Enumerator};
pub use filter::FilterCriteria;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error, with_retry,
};

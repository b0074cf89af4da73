//! Server-state cache: keyed reads with stale times, one fetch in flight per
//! key, invalidation after writes.

pub mod key;
pub mod query_cache;
pub mod retry;

pub use key::QueryKey;
pub use query_cache::{QueryCache, QueryOptions};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use anyhow::Result;

pub mod memory;

pub use memory::MemoryStore;

/// Storage engine the queue and event log run on. Any backend offering
/// an atomic list pop, a composite-keyed hash with pattern scan, and a
/// sorted set with range-by-score is substitutable.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Appends a value at the tail of the list.
    async fn list_push(&self, key: &str, value: String) -> Result<()>;
    /// Removes and returns the head of the list. Must be indivisible:
    /// two concurrent callers never receive the same element.
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>>;
    async fn list_len(&self, key: &str) -> Result<usize>;
    async fn list_range(&self, key: &str) -> Result<Vec<String>>;

    async fn hash_set(&self, table: &str, field: &str, value: String) -> Result<()>;
    async fn hash_get(&self, table: &str, field: &str) -> Result<Option<String>>;
    /// Scans hash fields matching a glob pattern (`*` wildcard only).
    /// Result order must be deterministic for unchanged data.
    async fn hash_scan(&self, table: &str, pattern: &str) -> Result<Vec<(String, String)>>;

    /// Inserts a member scored by `score` (milliseconds). Members with
    /// equal scores keep their insertion order.
    async fn zset_add(&self, key: &str, score: i64, member: String) -> Result<()>;
    /// Returns `(score, member)` pairs ordered by descending score,
    /// restricted to scores strictly greater than `min_exclusive` when set.
    async fn zset_rev_range_by_score(
        &self,
        key: &str,
        min_exclusive: Option<i64>,
    ) -> Result<Vec<(i64, String)>>;
}

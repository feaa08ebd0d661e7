use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use anyhow::Result;
use tokio::sync::Mutex;

use super::Store;

/// In-process backend. A single mutex guards all three keyspaces, which
/// makes `list_pop_front` trivially atomic across concurrent workers.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    lists: HashMap<String, VecDeque<String>>,
    // BTreeMap so scans come back in a stable field order
    hashes: HashMap<String, BTreeMap<String, String>>,
    // kept sorted by score, insertion order preserved among equal scores
    zsets: HashMap<String, Vec<(i64, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_push(&self, key: &str, value: String) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.lists.entry(key.to_string()).or_default().push_back(value);
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        Ok(inner.lists.get(key).map(|list| list.len()).unwrap_or(0))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_set(&self, table: &str, field: &str, value: String) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .hashes
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get(&self, table: &str, field: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .hashes
            .get(table)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hash_scan(&self, table: &str, pattern: &str) -> Result<Vec<(String, String)>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .hashes
            .get(table)
            .map(|hash| {
                hash.iter()
                    .filter(|(field, _)| glob_match(pattern, field))
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn zset_add(&self, key: &str, score: i64, member: String) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let set = inner.zsets.entry(key.to_string()).or_default();
        // insert after any existing members with the same score
        let pos = set.partition_point(|(s, _)| *s <= score);
        set.insert(pos, (score, member));
        Ok(())
    }

    async fn zset_rev_range_by_score(
        &self,
        key: &str,
        min_exclusive: Option<i64>,
    ) -> Result<Vec<(i64, String)>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .zsets
            .get(key)
            .map(|set| {
                set.iter()
                    .rev()
                    .filter(|(score, _)| min_exclusive.map(|min| *score > min).unwrap_or(true))
                    .map(|(score, member)| (*score, member.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Matches `text` against a glob pattern where `*` spans any substring.
fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) {
        return false;
    }
    let mut rest = &text[first.len()..];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
mod glob_tests {
    use super::glob_match;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("ns:p1:abc", "ns:p1:abc"));
        assert!(glob_match("*:*:abc", "ns:p1:abc"));
        assert!(glob_match("ns:p1:*", "ns:p1:abc"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("*:*:abc", "ns:p1:xyz"));
        assert!(!glob_match("ns:p2:*", "ns:p1:abc"));
        assert!(!glob_match("ns:p1:abc", "ns:p1:abcd"));
    }
}

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;

use super::KvStore;

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
}

/// In-process store with the same semantics as the Redis commands it
/// stands in for.
#[derive(Default)]
pub struct MemoryKvStore {
    inner: RwLock<Inner>,
}

impl MemoryKvStore {
    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .map(|inner| inner.hashes.is_empty() && inner.sorted_sets.is_empty())
            .unwrap_or(true)
    }
}

fn poisoned<T>(_: T) -> Error {
    anyhow!("Memory store lock poisoned")
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), Error> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let hash = inner.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), Error> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().map_err(poisoned)?;
        let Some(set) = inner.sorted_sets.get(key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(&String, &f64)> = set.iter().collect();
        // Redis orders equal scores lexicographically, reversed here
        members.sort_by(|(a_member, a_score), (b_member, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b_member.cmp(a_member))
        });

        if start > stop {
            return Ok(Vec::new());
        }
        Ok(members
            .into_iter()
            .skip(start)
            .take(stop - start + 1)
            .map(|(member, _)| member.clone())
            .collect())
    }
}

//! Session-scoped memo of finished answers.
//!
//! Keys compare the question byte-for-byte, so `"What is ATP?"` and
//! `"What is ATP? "` are separate entries. Entries live until the cache is
//! dropped; there is no TTL and no eviction.

use crate::models::Answer;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub question: String,
    pub k: usize,
}

impl CacheKey {
    pub fn new(question: &str, k: usize) -> Self {
        Self {
            question: question.to_string(),
            k,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub answer: Answer,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct AnswerCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Answer> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(k = key.k, cached_at = %entry.cached_at.to_rfc3339(), "answer cache hit");
                Some(entry.answer.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `answer`, replacing any previous entry for `key`.
    pub async fn insert(&self, key: CacheKey, answer: Answer) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                answer,
                cached_at: Utc::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

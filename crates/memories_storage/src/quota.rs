//! Per-namespace quota accounting.
//!
//! Usage is never cached: every query re-lists the namespace, so it always
//! agrees with the store at the cost of one enumeration per call.

use crate::path::namespace_prefix;
use crate::translate::translate;
use crate::{ObjectEntry, ObjectStore};
use derive_getters::Getters;
use memories_error::MemoriesResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Aggregate usage of one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Quota {
    /// Bytes currently stored
    used_bytes: u64,
    /// Quota ceiling in bytes
    total_bytes: u64,
    /// `used_bytes / total_bytes * 100`
    percentage: f64,
}

impl Quota {
    /// Build a quota snapshot.
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let percentage = if total_bytes == 0 {
            100.0
        } else {
            used_bytes as f64 * 100.0 / total_bytes as f64
        };
        Self {
            used_bytes,
            total_bytes,
            percentage,
        }
    }

    /// Whether `additional_bytes` more would still fit.
    pub fn fits(&self, additional_bytes: u64) -> bool {
        self.used_bytes
            .checked_add(additional_bytes)
            .is_some_and(|total| total <= self.total_bytes)
    }

    /// Bytes left before the ceiling.
    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

/// Computes namespace usage from the store's listing.
///
/// [`has_space`](Self::has_space) is a snapshot check. Nothing holds the
/// namespace between the check and a subsequent write, so concurrent uploads
/// can each pass and together exceed the ceiling.
#[derive(Clone)]
pub struct QuotaAccountant {
    store: Arc<dyn ObjectStore>,
    total_bytes: u64,
}

impl QuotaAccountant {
    /// Create an accountant enforcing `total_bytes` per namespace.
    pub fn new(store: Arc<dyn ObjectStore>, total_bytes: u64) -> Self {
        Self { store, total_bytes }
    }

    /// Quota ceiling in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Current usage of `namespace`.
    ///
    /// Objects with no reported size count as zero.
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn usage(&self, namespace: &str) -> MemoriesResult<Quota> {
        let prefix = namespace_prefix(namespace);
        let entries = self
            .store
            .list(&prefix)
            .await
            .map_err(|e| translate("usage", namespace, None, e))?;

        let used = sum_sizes(namespace, &entries);
        tracing::debug!(used, total = self.total_bytes, objects = entries.len(), "Computed usage");
        Ok(Quota::new(used, self.total_bytes))
    }

    /// Whether `additional_bytes` more would fit in `namespace` right now.
    #[tracing::instrument(skip(self))]
    pub async fn has_space(&self, namespace: &str, additional_bytes: u64) -> MemoriesResult<bool> {
        Ok(self.usage(namespace).await?.fits(additional_bytes))
    }
}

fn sum_sizes(namespace: &str, entries: &[ObjectEntry]) -> u64 {
    entries.iter().fold(0u64, |acc, entry| match entry.size {
        Some(size) => acc.saturating_add(size),
        None => {
            tracing::warn!(
                namespace,
                key = %entry.key,
                "Object has no size metadata, counting it as zero"
            );
            acc
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MIB;

    #[test]
    fn test_percentage() {
        let quota = Quota::new(60 * MIB, 100 * MIB);
        assert_eq!(*quota.percentage(), 60.0);
        assert_eq!(quota.remaining_bytes(), 40 * MIB);
    }

    #[test]
    fn test_fits_boundary() {
        let quota = Quota::new(60 * MIB, 100 * MIB);
        assert!(quota.fits(40 * MIB));
        assert!(!quota.fits(40 * MIB + 1));
        assert!(!quota.fits(u64::MAX));
    }

    #[test]
    fn test_missing_sizes_count_as_zero() {
        let entries = vec![
            ObjectEntry {
                key: "events/e/1-a.jpg".into(),
                size: Some(5),
                content_type: None,
                created_at: None,
            },
            ObjectEntry {
                key: "events/e/2-b.jpg".into(),
                size: None,
                content_type: None,
                created_at: None,
            },
        ];
        assert_eq!(sum_sizes("e", &entries), 5);
    }
}

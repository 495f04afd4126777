//! Quality buckets for per-move loss values
//!
//! A catalog is an ordered list of buckets with ascending inclusive upper
//! bounds; the last bound is unbounded. Score-loss and win-rate-loss use
//! independent catalogs and are never mixed.

use serde::{Deserialize, Serialize};

/// A named loss range used for histograms and board colouring
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub id: &'static str,
    pub label: &'static str,
    /// Inclusive upper bound; `f64::INFINITY` for the open-ended bucket
    pub upper_bound: f64,
    pub color: Option<&'static str>,
}

/// Ordered, gap-free partition of `[0, ∞)`
#[derive(Debug, Clone, Copy)]
pub struct BucketCatalog {
    buckets: &'static [Bucket],
}

/// Score-loss buckets, in points
pub static SCORE_BUCKETS: BucketCatalog = BucketCatalog {
    buckets: &[
        Bucket { id: "best", label: "Best (<=0.5)", upper_bound: 0.5, color: Some("#3b82f6") },
        Bucket { id: "good", label: "Good (0.5-1.5)", upper_bound: 1.5, color: Some("#22c55e") },
        Bucket { id: "ok", label: "Ok (1.5-3)", upper_bound: 3.0, color: Some("#facc15") },
        Bucket { id: "bad", label: "Bad (3-6)", upper_bound: 6.0, color: Some("#ef4444") },
        Bucket { id: "blunder", label: "Blunder (6-12+)", upper_bound: f64::INFINITY, color: Some("#a855f7") },
    ],
};

/// Win-rate-loss buckets, in percentage points
pub static WINRATE_BUCKETS: BucketCatalog = BucketCatalog {
    buckets: &[
        Bucket { id: "lt1", label: "<1%", upper_bound: 1.0, color: None },
        Bucket { id: "1-3", label: "1-3%", upper_bound: 3.0, color: None },
        Bucket { id: "3-6", label: "3-6%", upper_bound: 6.0, color: None },
        Bucket { id: "6-12", label: "6-12%", upper_bound: 12.0, color: None },
        Bucket { id: "12-24", label: "12-24%", upper_bound: 24.0, color: None },
        Bucket { id: "24+", label: "24%+", upper_bound: f64::INFINITY, color: None },
    ],
};

impl BucketCatalog {
    pub fn buckets(&self) -> &'static [Bucket] {
        self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Position of the bucket a loss falls into
    ///
    /// Negative losses are classified by magnitude. Anything beyond every
    /// finite bound, including NaN, lands in the last bucket.
    pub fn classify_index(&self, loss: f64) -> usize {
        let loss = loss.abs();
        self.buckets
            .iter()
            .position(|bucket| loss <= bucket.upper_bound)
            .unwrap_or(self.buckets.len() - 1)
    }

    pub fn classify(&self, loss: f64) -> &'static Bucket {
        &self.buckets[self.classify_index(loss)]
    }
}

/// Per-bucket counters aligned with a catalog's order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u32>,
}

impl Histogram {
    pub fn for_catalog(catalog: &BucketCatalog) -> Self {
        Self {
            counts: vec![0; catalog.len()],
        }
    }

    pub fn increment(&mut self, index: usize) {
        if let Some(count) = self.counts.get_mut(index) {
            *count += 1;
        }
    }

    /// Add another histogram cell by cell
    pub fn merge(&mut self, other: &Histogram) {
        if self.counts.len() < other.counts.len() {
            self.counts.resize(other.counts.len(), 0);
        }
        for (count, add) in self.counts.iter_mut().zip(&other.counts) {
            *count += add;
        }
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn get(&self, index: usize) -> u32 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Pair each count with its bucket
    pub fn labeled<'a>(
        &'a self,
        catalog: &BucketCatalog,
    ) -> impl Iterator<Item = (&'static Bucket, u32)> + 'a {
        catalog.buckets().iter().zip(self.counts.iter().copied())
    }
}

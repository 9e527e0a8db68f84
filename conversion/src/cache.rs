//! Time-bounded in-memory cache for conversion results.
//!
//! Purely a latency optimization: conversion is a pure function, so a hit
//! returns exactly what a fresh computation would. Entries expire after the
//! configured TTL and are dropped lazily on lookup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tabula_types::GradingSystem;

use crate::engine::Conversion;

type CacheKey = (GradingSystem, GradingSystem, String);

struct CacheSlot {
    conversion: Conversion,
    cached_at: Instant,
}

pub struct ConversionCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheSlot>>,
}

impl ConversionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry; expired entries are evicted on the way.
    pub(crate) fn get(
        &self,
        origin: GradingSystem,
        destination: GradingSystem,
        canonical_value: &str,
    ) -> Option<Conversion> {
        let key = (origin, destination, canonical_value.to_string());
        let mut entries = self.entries.lock().ok()?;
        match entries.get(&key) {
            Some(slot) if slot.cached_at.elapsed() < self.ttl => Some(slot.conversion.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store an entry, sweeping out everything already expired so keys that
    /// are never looked up again cannot accumulate.
    pub(crate) fn put(&self, canonical_value: String, conversion: &Conversion) {
        let key = (
            conversion.origin,
            conversion.destination,
            canonical_value,
        );
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, slot| slot.cached_at.elapsed() < self.ttl);
            entries.insert(
                key,
                CacheSlot {
                    conversion: conversion.clone(),
                    cached_at: Instant::now(),
                },
            );
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

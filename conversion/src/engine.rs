//! The conversion engine: origin → normalized → destination.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabula_types::{GradeValue, GradingSystem, NormalizedScore};

use crate::cache::ConversionCache;
use crate::normalize::{denormalize, domain_values, normalize};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("origin and destination are both {0}; nothing to convert")]
    SameSystem(GradingSystem),
}

/// The result of converting one grade between systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub origin: GradingSystem,
    pub destination: GradingSystem,
    pub original_value: GradeValue,
    /// Canonical score, rounded to two decimals.
    pub normalized_score: NormalizedScore,
    pub converted_value: GradeValue,
    /// Identifies the rule that produced this conversion, e.g. `"uk->us"`.
    pub rule_id: String,
    pub converted_at: DateTime<Utc>,
}

/// One row of an equivalence table between two systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceRow {
    pub origin_value: GradeValue,
    pub normalized_score: NormalizedScore,
    pub destination_value: GradeValue,
}

/// The supported systems and the discrete scale of each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCatalog {
    pub systems: Vec<GradingSystem>,
    pub scales: BTreeMap<GradingSystem, Vec<GradeValue>>,
}

/// Stateless conversion hub. Cloneable views are unnecessary: conversion is
/// pure, and the optional cache is internally synchronized, so one engine can
/// be shared freely.
#[derive(Default)]
pub struct ConversionEngine {
    cache: Option<ConversionCache>,
}

impl ConversionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Engine with a TTL-bounded result cache. The cache never changes
    /// results, only response latency.
    #[must_use]
    pub fn with_cache(ttl: Duration) -> Self {
        Self {
            cache: Some(ConversionCache::new(ttl)),
        }
    }

    /// Convert a grade into `destination`'s representation.
    pub fn convert(
        &self,
        destination: GradingSystem,
        value: &GradeValue,
    ) -> Result<Conversion, ConversionError> {
        let origin = value.system();
        if origin == destination {
            return Err(ConversionError::SameSystem(origin));
        }

        // Cache key is the canonical serialized value; if serialization ever
        // failed we would simply skip the cache, not the conversion.
        let cache_key = value.canonical_json().ok();
        if let (Some(cache), Some(key)) = (&self.cache, cache_key.as_deref()) {
            if let Some(hit) = cache.get(origin, destination, key) {
                tracing::debug!(%origin, %destination, "conversion cache hit");
                return Ok(hit);
            }
        }

        let normalized = normalize(value).rounded();
        let conversion = Conversion {
            origin,
            destination,
            original_value: *value,
            normalized_score: normalized,
            converted_value: denormalize(normalized, destination),
            rule_id: rule_id(origin, destination),
            converted_at: Utc::now(),
        };

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.put(key, &conversion);
        }
        Ok(conversion)
    }

    /// Convert into every system except the origin. Per-destination failures
    /// are captured individually; the batch never aborts.
    #[must_use]
    pub fn convert_to_all(
        &self,
        value: &GradeValue,
    ) -> BTreeMap<GradingSystem, Result<Conversion, ConversionError>> {
        GradingSystem::all()
            .iter()
            .filter(|system| **system != value.system())
            .map(|system| (*system, self.convert(*system, value)))
            .collect()
    }

    /// Full equivalence table between two systems: one row per discrete grade
    /// point of the origin's domain, in its natural best-to-worst order.
    pub fn equivalence_table(
        &self,
        origin: GradingSystem,
        destination: GradingSystem,
    ) -> Result<Vec<EquivalenceRow>, ConversionError> {
        if origin == destination {
            return Err(ConversionError::SameSystem(origin));
        }
        Ok(domain_values(origin)
            .into_iter()
            .map(|value| {
                let normalized = normalize(&value).rounded();
                EquivalenceRow {
                    origin_value: value,
                    normalized_score: normalized,
                    destination_value: denormalize(normalized, destination),
                }
            })
            .collect())
    }

    /// Catalogue of supported systems and their discrete scales.
    #[must_use]
    pub fn rules(&self) -> RuleCatalog {
        let systems = GradingSystem::all().to_vec();
        let scales = systems
            .iter()
            .map(|system| (*system, domain_values(*system)))
            .collect();
        RuleCatalog { systems, scales }
    }
}

fn rule_id(origin: GradingSystem, destination: GradingSystem) -> String {
    format!("{origin}->{destination}")
}

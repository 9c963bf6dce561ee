//! Content fingerprints for listings and a TTL cache of recently persisted ones.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::clock::Clock;
use crate::models::Listing;

pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Fingerprint a listing's core fields.
///
/// Field order is fixed; missing fields contribute an empty string.
pub fn signature(listing: &Listing) -> String {
    let fields = [
        Some(listing.intent.sheet_label()),
        listing.operation_type.as_deref(),
        listing.property_category.as_deref(),
        listing.commune(),
        listing.bedrooms.as_deref(),
        listing.bathrooms.as_deref(),
        listing.price.as_deref(),
        listing.currency.as_ref().map(|c| c.as_str()),
    ];

    let canonical = fields
        .iter()
        .map(|field| field.unwrap_or("").trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");

    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Signatures seen recently, each with the time it was remembered
pub struct SignatureCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SignatureCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True if the signature was remembered within the TTL. Expired entries are evicted.
    pub fn seen_recently(&self, signature: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();

        match entries.get(signature) {
            Some(&seen_at) if now - seen_at < self.ttl => true,
            Some(_) => {
                entries.remove(signature);
                debug!(signature, "Evicted expired signature");
                false
            }
            None => false,
        }
    }

    /// Record the signature as seen now and sweep expired entries
    pub fn remember(&self, signature: &str) {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries();

        entries.insert(signature.to_string(), now);
        let before = entries.len();
        entries.retain(|_, seen_at| now - *seen_at < ttl);
        if entries.len() < before {
            debug!(swept = before - entries.len(), "Swept expired signatures");
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Intent};
    use crate::testing::ManualClock;

    fn offer() -> Listing {
        let mut listing = Listing::new(Intent::Offer, "Arriendo depto 2D1B Ñuñoa $550.000");
        listing.operation_type = Some("Arriendo".into());
        listing.property_category = Some("Departamento".into());
        listing.commune_options = vec!["Ñuñoa".into()];
        listing.bedrooms = Some("2".into());
        listing.bathrooms = Some("1".into());
        listing.price = Some("550000".into());
        listing.currency = Some(Currency::Clp);
        listing
    }

    #[test]
    fn signature_ignores_case_whitespace_and_non_core_fields() {
        let a = offer();
        let mut b = offer();
        b.operation_type = Some("  ARRIENDO ".into());
        b.contact_phone = Some("+56911112222".into());
        b.source_text = "otro texto".into();
        assert_eq!(signature(&a), signature(&b));

        let mut c = offer();
        c.price = Some("560000".into());
        assert_ne!(signature(&a), signature(&c));
        assert_eq!(signature(&a).len(), 64);
    }

    #[test]
    fn cache_expires_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = SignatureCache::new(clock.clone());
        let sig = signature(&offer());

        assert!(!cache.seen_recently(&sig));
        cache.remember(&sig);
        assert!(cache.seen_recently(&sig));

        clock.advance(Duration::hours(23));
        assert!(cache.seen_recently(&sig));

        clock.advance(Duration::hours(2));
        assert!(!cache.seen_recently(&sig));
        assert!(cache.is_empty());
    }

    #[test]
    fn remember_sweeps_expired_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = SignatureCache::new(clock.clone());
        cache.remember("old");
        clock.advance(Duration::hours(25));
        cache.remember("new");
        assert_eq!(cache.len(), 1);
        assert!(cache.seen_recently("new"));
    }
}

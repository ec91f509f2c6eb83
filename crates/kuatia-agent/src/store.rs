//! # Persistent Configuration Store Seam
//!
//! The durable key/value contract the configuration cache writes through.
//! Any medium that can hold one JSON-serializable entry per taxpayer
//! satisfies it; the stack ships [`MemoryConfigStore`] here and a
//! file-backed store in the CLI crate.
//!
//! The trait is synchronous: implementations are local media, and keeping
//! it sync keeps it object-safe without an async shim.

use dashmap::DashMap;

use kuatia_core::{AgentError, CacheEntry, IssuerConfiguration, Ruc};

/// Durable store holding at most one configuration entry per taxpayer.
///
/// Implementations must be `Send + Sync`; the cache shares them behind an
/// `Arc`. Failures surface as [`AgentError::ConfigurationRetrieval`].
pub trait ConfigStore: Send + Sync {
    /// Load the entry for a taxpayer, if one is physically present.
    /// Expiry is the cache's concern, not the store's.
    fn load(&self, ruc: &Ruc) -> Result<Option<CacheEntry<IssuerConfiguration>>, AgentError>;

    /// Write the entry for a taxpayer, overwriting any prior entry.
    fn save(&self, ruc: &Ruc, entry: &CacheEntry<IssuerConfiguration>) -> Result<(), AgentError>;

    /// Delete the entry for a taxpayer. Returns whether an entry existed;
    /// deleting an absent entry is not an error.
    fn delete(&self, ruc: &Ruc) -> Result<bool, AgentError>;
}

/// In-memory store for tests and embedders that manage durability
/// themselves.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: DashMap<String, CacheEntry<IssuerConfiguration>>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, ruc: &Ruc) -> Result<Option<CacheEntry<IssuerConfiguration>>, AgentError> {
        Ok(self.entries.get(ruc.as_str()).map(|e| e.clone()))
    }

    fn save(&self, ruc: &Ruc, entry: &CacheEntry<IssuerConfiguration>) -> Result<(), AgentError> {
        self.entries
            .insert(ruc.as_str().to_string(), entry.clone());
        Ok(())
    }

    fn delete(&self, ruc: &Ruc) -> Result<bool, AgentError> {
        Ok(self.entries.remove(ruc.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use kuatia_core::{
        DocumentType, EconomicActivity, SecurityCode, StampNumber, TaxpayerType,
    };

    fn entry() -> CacheEntry<IssuerConfiguration> {
        CacheEntry::new(
            IssuerConfiguration {
                stamp_number: StampNumber::new("12558946").expect("valid stamp"),
                establishment: 1,
                dispatch_point: 1,
                document_type: DocumentType::ElectronicInvoice,
                economic_activity: EconomicActivity {
                    code: "47190".into(),
                    description: "Retail trade".into(),
                },
                validity_start: NaiveDate::from_ymd_opt(2023, 3, 1).expect("valid date"),
                taxpayer_type: TaxpayerType::LegalEntity,
                security_code: SecurityCode::new("123456789").expect("valid CSC"),
                logo: None,
                advanced: None,
            },
            Duration::days(90),
        )
    }

    #[test]
    fn load_of_absent_key_is_none() {
        let store = MemoryConfigStore::new();
        let ruc = Ruc::new("5452").expect("valid RUC");
        assert!(store.load(&ruc).expect("load").is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = MemoryConfigStore::new();
        let ruc = Ruc::new("5452").expect("valid RUC");
        store.save(&ruc, &entry()).expect("save");
        let loaded = store.load(&ruc).expect("load").expect("entry present");
        assert_eq!(loaded.value, entry().value);
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryConfigStore::new();
        let ruc = Ruc::new("5452").expect("valid RUC");
        store.save(&ruc, &entry()).expect("save");
        assert!(store.delete(&ruc).expect("first delete"));
        assert!(!store.delete(&ruc).expect("second delete is a no-op"));
    }

    #[test]
    fn entries_are_keyed_per_taxpayer() {
        let store = MemoryConfigStore::new();
        let a = Ruc::new("5452").expect("valid RUC");
        let b = Ruc::new("80012345").expect("valid RUC");
        store.save(&a, &entry()).expect("save");
        assert!(store.load(&b).expect("load").is_none());
    }
}

//! Data provider seam.
//!
//! RULE: the engine reads ledger data only through `DataProvider`.
//! Providers return current rows only (soft-deleted rows filtered out);
//! the engine still re-sorts and re-validates dates itself.

use crate::{
    error::{AuditError, AuditResult},
    types::{EntityKey, EntityRecord, PaymentEvent},
};
use std::collections::{BTreeMap, BTreeSet};

/// One listed entity with the outcome of fetching its payments.
#[derive(Debug)]
pub struct EntityLoad {
    pub entity: EntityRecord,
    pub events: AuditResult<Vec<PaymentEvent>>,
}

pub trait DataProvider {
    /// Active entities with their recorded configuration.
    fn list_active_entities(&self) -> AuditResult<Vec<EntityRecord>>;

    /// Current payments of one entity, ordered by date.
    fn get_events(&self, key: EntityKey) -> AuditResult<Vec<PaymentEvent>>;

    /// Everything one run needs. Providers backed by a real store should
    /// override this with a single bulk read.
    fn load_histories(&self) -> AuditResult<Vec<EntityLoad>> {
        let entities = self.list_active_entities()?;
        Ok(entities
            .into_iter()
            .map(|entity| {
                let events = self.get_events(entity.key);
                EntityLoad { entity, events }
            })
            .collect())
    }
}

/// In-memory provider. Used by tests and by callers that already hold
/// materialized histories.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    entities: Vec<EntityRecord>,
    events: BTreeMap<EntityKey, Vec<PaymentEvent>>,
    failing: BTreeSet<EntityKey>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityRecord, events: Vec<PaymentEvent>) -> Self {
        self.events.insert(entity.key, events);
        self.entities.push(entity);
        self
    }

    /// Make `get_events` fail for `key`.
    pub fn with_failure(mut self, key: EntityKey) -> Self {
        self.failing.insert(key);
        self
    }
}

impl DataProvider for MemoryProvider {
    fn list_active_entities(&self) -> AuditResult<Vec<EntityRecord>> {
        Ok(self.entities.clone())
    }

    fn get_events(&self, key: EntityKey) -> AuditResult<Vec<PaymentEvent>> {
        if self.failing.contains(&key) {
            return Err(AuditError::DataAccess {
                entity: key,
                reason: "provider unavailable".into(),
            });
        }
        Ok(self.events.get(&key).cloned().unwrap_or_default())
    }
}

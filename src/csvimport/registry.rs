//! Validator/mapper registry
//!
//! One validator + mapper pair per importable entity type, looked up by
//! the closed `ImportEntityType` enum. An entity type without a
//! registered pair is rejected at the service boundary.

use std::collections::HashMap;
use std::sync::Arc;

use crate::csvimport::mapper::EntityMapper;
use crate::csvimport::validator::EntityValidator;
use crate::types::ImportEntityType;

#[derive(Default)]
pub struct ImportRegistry {
    validators: HashMap<ImportEntityType, Arc<dyn EntityValidator>>,
    mappers: HashMap<ImportEntityType, Arc<dyn EntityMapper>>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the validator/mapper pair for an entity type. Re-registering
    /// replaces the previous pair.
    pub fn register(
        &mut self,
        entity_type: ImportEntityType,
        validator: Arc<dyn EntityValidator>,
        mapper: Arc<dyn EntityMapper>,
    ) {
        self.validators.insert(entity_type, validator);
        self.mappers.insert(entity_type, mapper);
    }

    pub fn validator(&self, entity_type: ImportEntityType) -> Option<Arc<dyn EntityValidator>> {
        self.validators.get(&entity_type).cloned()
    }

    pub fn mapper(&self, entity_type: ImportEntityType) -> Option<Arc<dyn EntityMapper>> {
        self.mappers.get(&entity_type).cloned()
    }

    pub fn is_registered(&self, entity_type: ImportEntityType) -> bool {
        self.validators.contains_key(&entity_type) && self.mappers.contains_key(&entity_type)
    }
}

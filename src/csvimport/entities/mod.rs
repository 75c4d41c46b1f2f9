//! Per-entity-type import plugins

pub mod camper;

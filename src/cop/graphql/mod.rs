pub mod field_definitions;

use super::registry::CopRegistry;
use super::CopLoadError;
use crate::config::ResolvedConfig;

/// Cop names in this department, in registration order.
pub const COP_NAMES: &[&str] = &[field_definitions::NAME];

pub fn register_all(registry: &mut CopRegistry, config: &ResolvedConfig) -> Result<(), CopLoadError> {
    registry.register_configured(config, field_definitions::NAME, |cop_config| {
        Ok(Box::new(field_definitions::FieldDefinitions::from_config(
            cop_config,
        )?))
    })
}

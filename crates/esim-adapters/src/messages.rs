use esim_core::error::ProvisioningError;
use esim_core::messages::{DefaultMessages, MessageCatalog, MessageKey};
use std::collections::BTreeMap;

/// Catalog that replaces selected keys and falls back to [`DefaultMessages`].
#[derive(Debug, Clone, Default)]
pub struct OverrideMessages {
    overrides: BTreeMap<MessageKey, String>,
}

impl OverrideMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        self.overrides.insert(key, text.into());
        self
    }

    /// Build from `key name -> text` pairs, e.g. a config file section.
    pub fn from_names(entries: &BTreeMap<String, String>) -> Result<Self, ProvisioningError> {
        let mut catalog = Self::new();
        for (name, text) in entries {
            let key = MessageKey::from_name(name).ok_or_else(|| {
                ProvisioningError::Config(format!("unknown message key '{name}'"))
            })?;
            catalog.overrides.insert(key, text.clone());
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl MessageCatalog for OverrideMessages {
    fn resolve(&self, key: MessageKey) -> String {
        self.overrides
            .get(&key)
            .cloned()
            .unwrap_or_else(|| DefaultMessages::text(key).to_string())
    }
}

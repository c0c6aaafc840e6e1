use serde::{Deserialize, Serialize};

/// Fixed message keys the flow asks the catalog to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    ActiveSuccess,
    InactiveSuccess,
    DownloadFailure,
    NoPrivileges,
    PrivilegesReady,
    ServiceDisabled,
}

impl MessageKey {
    pub const ALL: [MessageKey; 6] = [
        Self::ActiveSuccess,
        Self::InactiveSuccess,
        Self::DownloadFailure,
        Self::NoPrivileges,
        Self::PrivilegesReady,
        Self::ServiceDisabled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ActiveSuccess => "active_success",
            Self::InactiveSuccess => "inactive_success",
            Self::DownloadFailure => "download_failure",
            Self::NoPrivileges => "no_privileges",
            Self::PrivilegesReady => "privileges_ready",
            Self::ServiceDisabled => "service_disabled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// Resolves message keys to display strings. Locale handling is up to the
/// implementation.
pub trait MessageCatalog: Send + Sync {
    fn resolve(&self, key: MessageKey) -> String;
}

/// Built-in English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl DefaultMessages {
    pub fn text(key: MessageKey) -> &'static str {
        match key {
            MessageKey::ActiveSuccess => "eSIM active",
            MessageKey::InactiveSuccess => {
                "eSIM downloaded but inactive — platform cannot activate inline"
            }
            MessageKey::DownloadFailure => "eSIM download failed",
            MessageKey::NoPrivileges => "No carrier privileges detected",
            MessageKey::PrivilegesReady => "Carrier privileges ready",
            MessageKey::ServiceDisabled => "eSIM provisioning service is disabled",
        }
    }
}

impl MessageCatalog for DefaultMessages {
    fn resolve(&self, key: MessageKey) -> String {
        Self::text(key).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in MessageKey::ALL {
            assert_eq!(MessageKey::from_name(key.name()), Some(key));
        }
        assert_eq!(MessageKey::from_name("unknown"), None);
    }

    #[test]
    fn default_catalog_outcome_texts() {
        let catalog = DefaultMessages;
        assert_eq!(catalog.resolve(MessageKey::ActiveSuccess), "eSIM active");
        assert_eq!(
            catalog.resolve(MessageKey::DownloadFailure),
            "eSIM download failed"
        );
    }
}

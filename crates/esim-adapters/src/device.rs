use esim_core::platform::{CarrierPrivileges, PlatformCapabilities};

/// First platform API level that activates a downloaded profile inline.
pub const INLINE_ACTIVATION_MIN_API_LEVEL: u32 = 29;

/// Privilege check with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCarrierPrivileges(pub bool);

impl FixedCarrierPrivileges {
    pub fn granted() -> Self {
        Self(true)
    }

    pub fn denied() -> Self {
        Self(false)
    }
}

impl CarrierPrivileges for FixedCarrierPrivileges {
    fn has_carrier_privileges(&self) -> bool {
        self.0
    }
}

/// Capabilities derived from the device's platform API level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiLevelCapabilities {
    pub api_level: u32,
}

impl ApiLevelCapabilities {
    pub fn new(api_level: u32) -> Self {
        Self { api_level }
    }
}

impl PlatformCapabilities for ApiLevelCapabilities {
    fn supports_inline_activation(&self) -> bool {
        self.api_level >= INLINE_ACTIVATION_MIN_API_LEVEL
    }
}

use crate::att::{HandleRange, MTU_MAX, MTU_MIN};

/// GATT server configuration.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    /// Maximum number of concurrently registered applications.
    pub max_applications: usize,
    /// MTU offered by the server in an MTU exchange.
    pub server_mtu: u16,
    /// Attribute handles available to the database.
    pub handle_range: HandleRange,
}

impl Config {
    /// Loads the configuration from a JSON document. Missing fields take their
    /// default values.
    #[cfg(feature = "json")]
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Returns the server MTU clamped to the valid ATT range.
    #[inline]
    #[must_use]
    pub(super) fn mtu(&self) -> u16 {
        self.server_mtu.clamp(MTU_MIN, MTU_MAX)
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            max_applications: 16,
            server_mtu: MTU_MAX,
            handle_range: HandleRange::ALL,
        }
    }
}

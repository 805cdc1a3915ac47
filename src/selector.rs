//! Multicast delivery mode selection
//!
//! The [`ModeSelector`] is what a MAC transmitter consults before sending a
//! group-addressed frame: which delivery mode is configured, how many retries
//! the mode allows, which retry is in progress, and who the recipients are.
//! Group membership changes are forwarded to the owned [`GroupRegistry`].

use crate::address::{GroupAddress, StationAddress};
use crate::config::{check_retries, check_retry, DeliveryConfig, DEFAULT_RETRIES};
use crate::mode::MulticastModeKind;
use crate::registry::GroupRegistry;
use crate::{MulticastError, Result};

/// Attribute name of the delivery mode
pub const ATTR_MODE: &str = "Mode";
/// Attribute name of the retry count
pub const ATTR_RETRIES: &str = "Retries";
/// Attribute name of the retry index
pub const ATTR_RETRY: &str = "Retry";

/// Delivery mode, retry progress and group membership for one MAC entity
#[derive(Debug, Clone)]
pub struct ModeSelector {
    /// Configured delivery mode
    mode: MulticastModeKind,
    /// Maximum number of retries
    retries: i16,
    /// Retry in progress, always within `0..=retries`
    retry: i16,
    /// Group membership
    registry: GroupRegistry,
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self {
            mode: MulticastModeKind::Legacy,
            retries: DEFAULT_RETRIES,
            retry: 0,
            registry: GroupRegistry::new(),
        }
    }
}

impl ModeSelector {
    /// Create selector with default tunables (Legacy, 3 retries, retry 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create selector from validated tunables
    pub fn with_config(config: &DeliveryConfig) -> Result<Self> {
        let mut selector = Self::new();
        selector.apply_config(config)?;
        Ok(selector)
    }

    /// Set the delivery mode from its numeric value (0..=4)
    pub fn set_mode(&mut self, mode: i16) -> Result<()> {
        let kind = MulticastModeKind::try_from(mode)
            .inspect_err(|_| log::warn!("Rejected multicast mode {}", mode))?;
        self.set_mode_kind(kind);
        Ok(())
    }

    /// Set the delivery mode
    pub fn set_mode_kind(&mut self, mode: MulticastModeKind) {
        if self.mode != mode {
            log::info!("Multicast mode changed from {} to {}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Get the numeric delivery mode
    pub fn mode(&self) -> i16 {
        self.mode.value()
    }

    /// Get the delivery mode
    pub fn mode_kind(&self) -> MulticastModeKind {
        self.mode
    }

    /// Set the maximum number of retries.
    ///
    /// Fails on negative values and on values below the retry currently in
    /// progress.
    pub fn set_retries(&mut self, retries: i16) -> Result<()> {
        check_retries(retries).inspect_err(|e| log::warn!("Rejected retries {}: {}", retries, e))?;
        if retries < self.retry {
            log::warn!("Rejected retries {}: retry {} in progress", retries, self.retry);
            return Err(MulticastError::InvalidConfiguration(format!(
                "retries {} below retry in progress {}",
                retries, self.retry
            )));
        }

        self.retries = retries;
        Ok(())
    }

    /// Get the maximum number of retries
    pub fn retries(&self) -> i16 {
        self.retries
    }

    /// Set the index of the retry in progress (0..=retries)
    pub fn set_retry(&mut self, retry: i16) -> Result<()> {
        check_retry(retry, self.retries).inspect_err(|e| log::warn!("Rejected retry {}: {}", retry, e))?;

        self.retry = retry;
        Ok(())
    }

    /// Get the index of the retry in progress
    pub fn retry(&self) -> i16 {
        self.retry
    }

    /// Move to the next retry. Fails once `retries` has been reached.
    pub fn next_retry(&mut self) -> Result<i16> {
        if self.retry >= self.retries {
            return Err(MulticastError::InvalidConfiguration(format!(
                "no retries left ({} of {})",
                self.retry, self.retries
            )));
        }
        self.retry += 1;
        Ok(self.retry)
    }

    /// Go back to the first transmission
    pub fn reset_retry(&mut self) {
        self.retry = 0;
    }

    /// Check if the retry in progress is the last one allowed
    pub fn is_last_retry(&self) -> bool {
        self.retry >= self.retries
    }

    /// Set a tunable by attribute name
    pub fn set_attribute(&mut self, name: &str, value: i16) -> Result<()> {
        match name {
            ATTR_MODE => self.set_mode(value),
            ATTR_RETRIES => self.set_retries(value),
            ATTR_RETRY => self.set_retry(value),
            _ => Err(MulticastError::UnknownAttribute(name.to_string())),
        }
    }

    /// Get a tunable by attribute name
    pub fn attribute(&self, name: &str) -> Result<i16> {
        match name {
            ATTR_MODE => Ok(self.mode()),
            ATTR_RETRIES => Ok(self.retries),
            ATTR_RETRY => Ok(self.retry),
            _ => Err(MulticastError::UnknownAttribute(name.to_string())),
        }
    }

    /// Apply all tunables at once. Nothing changes if any value is invalid.
    pub fn apply_config(&mut self, config: &DeliveryConfig) -> Result<()> {
        let mode = config
            .validate()
            .inspect_err(|e| log::warn!("Rejected delivery configuration: {}", e))?;

        self.set_mode_kind(mode);
        self.retries = config.retries;
        self.retry = config.retry;
        Ok(())
    }

    /// Snapshot of the current tunables
    pub fn config(&self) -> DeliveryConfig {
        DeliveryConfig {
            mode: self.mode(),
            retries: self.retries,
            retry: self.retry,
        }
    }

    /// Register a station in a group. Registering twice adds a second entry.
    pub fn register(&mut self, group: GroupAddress, client: StationAddress) {
        self.registry.add_member(group, client);
    }

    /// Register a station in a group unless already registered
    pub fn register_unique(&mut self, group: GroupAddress, client: StationAddress) -> bool {
        self.registry.add_member_unique(group, client)
    }

    /// Remove a station from a group. Unknown groups or stations are ignored.
    pub fn deregister(&mut self, group: GroupAddress, client: StationAddress) -> bool {
        self.registry.remove_member(group, client)
    }

    /// Get a copy of the current recipients of a group
    pub fn get_group(&self, group: GroupAddress) -> Vec<StationAddress> {
        self.registry.lookup(group)
    }

    /// Check if a group exists
    pub fn has_group(&self, group: GroupAddress) -> bool {
        self.registry.has_group(group)
    }

    /// Read access to the group registry
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MacAddress;

    const G1: MacAddress = MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
    const STA_A: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0x0a]);
    const STA_B: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0x0b]);

    #[test]
    fn test_defaults() {
        let selector = ModeSelector::new();
        assert_eq!(selector.mode(), 0);
        assert_eq!(selector.mode_kind(), MulticastModeKind::Legacy);
        assert_eq!(selector.retries(), 3);
        assert_eq!(selector.retry(), 0);
        assert!(selector.registry().is_empty());
    }

    #[test]
    fn test_set_mode() {
        let mut selector = ModeSelector::new();
        for mode in MulticastModeKind::ALL {
            selector.set_mode(mode.value()).unwrap();
            assert_eq!(selector.mode_kind(), mode);
        }
    }

    #[test]
    fn test_set_mode_rejects_out_of_range() {
        let mut selector = ModeSelector::new();
        selector.set_mode(3).unwrap();

        assert!(matches!(
            selector.set_mode(9),
            Err(MulticastError::InvalidConfiguration(_))
        ));
        assert!(selector.set_mode(-1).is_err());
        assert_eq!(selector.mode(), 3);
    }

    #[test]
    fn test_set_retries() {
        let mut selector = ModeSelector::new();
        selector.set_retries(0).unwrap();
        assert_eq!(selector.retries(), 0);

        selector.set_retries(7).unwrap();
        assert!(selector.set_retries(-1).is_err());
        assert_eq!(selector.retries(), 7);
    }

    #[test]
    fn test_set_retries_below_retry_in_progress() {
        let mut selector = ModeSelector::new();
        selector.set_retry(3).unwrap();

        assert!(selector.set_retries(2).is_err());
        assert_eq!(selector.retries(), 3);

        selector.set_retries(3).unwrap();
    }

    #[test]
    fn test_set_retry_bounds() {
        let mut selector = ModeSelector::new();
        selector.set_retry(3).unwrap();
        assert_eq!(selector.retry(), 3);

        assert!(selector.set_retry(4).is_err());
        assert!(selector.set_retry(-1).is_err());
        assert_eq!(selector.retry(), 3);
    }

    #[test]
    fn test_retry_progress() {
        let mut selector = ModeSelector::new();
        selector.set_mode_kind(MulticastModeKind::GcrUr);
        selector.set_retries(2).unwrap();

        assert!(!selector.is_last_retry());
        assert_eq!(selector.next_retry().unwrap(), 1);
        assert_eq!(selector.next_retry().unwrap(), 2);
        assert!(selector.is_last_retry());
        assert!(selector.next_retry().is_err());
        assert_eq!(selector.retry(), 2);

        selector.reset_retry();
        assert_eq!(selector.retry(), 0);
    }

    #[test]
    fn test_zero_retries() {
        let mut selector = ModeSelector::new();
        selector.set_retries(0).unwrap();
        assert!(selector.is_last_retry());
        assert!(selector.next_retry().is_err());
    }

    #[test]
    fn test_attributes() {
        let mut selector = ModeSelector::new();
        selector.set_attribute(ATTR_MODE, 2).unwrap();
        selector.set_attribute(ATTR_RETRIES, 5).unwrap();
        selector.set_attribute(ATTR_RETRY, 4).unwrap();

        assert_eq!(selector.attribute(ATTR_MODE).unwrap(), 2);
        assert_eq!(selector.attribute(ATTR_RETRIES).unwrap(), 5);
        assert_eq!(selector.attribute(ATTR_RETRY).unwrap(), 4);

        assert!(selector.set_attribute(ATTR_MODE, 5).is_err());
        assert!(matches!(
            selector.set_attribute("Rate", 1),
            Err(MulticastError::UnknownAttribute(_))
        ));
        assert!(selector.attribute("Rate").is_err());
    }

    #[test]
    fn test_apply_config_is_atomic() {
        let mut selector = ModeSelector::new();
        selector
            .apply_config(&DeliveryConfig { mode: 2, retries: 5, retry: 1 })
            .unwrap();
        assert_eq!(selector.config(), DeliveryConfig { mode: 2, retries: 5, retry: 1 });

        // Valid mode and retries, but retry out of range: nothing is applied.
        let bad = DeliveryConfig { mode: 4, retries: 1, retry: 3 };
        assert!(selector.apply_config(&bad).is_err());
        assert_eq!(selector.config(), DeliveryConfig { mode: 2, retries: 5, retry: 1 });

        // Lowering retries together with retry is fine when done at once.
        selector
            .apply_config(&DeliveryConfig { mode: 2, retries: 0, retry: 0 })
            .unwrap();
        assert_eq!(selector.retries(), 0);
    }

    #[test]
    fn test_with_config() {
        let selector = ModeSelector::with_config(&DeliveryConfig { mode: 1, retries: 3, retry: 0 }).unwrap();
        assert_eq!(selector.mode_kind(), MulticastModeKind::Dms);

        assert!(ModeSelector::with_config(&DeliveryConfig { mode: 6, retries: 3, retry: 0 }).is_err());
    }

    #[test]
    fn test_registration_forwarding() {
        let mut selector = ModeSelector::new();
        selector.register(G1, STA_A);
        selector.register(G1, STA_B);
        assert!(!selector.register_unique(G1, STA_B));
        assert_eq!(selector.get_group(G1), vec![STA_A, STA_B]);

        assert!(selector.deregister(G1, STA_A));
        assert!(!selector.deregister(G1, STA_A));
        assert!(selector.deregister(G1, STA_B));
        assert!(!selector.has_group(G1));
        assert!(selector.get_group(G1).is_empty());
    }

    #[test]
    fn test_mode_change_keeps_membership() {
        let mut selector = ModeSelector::new();
        selector.register(G1, STA_A);
        selector.set_mode(4).unwrap();
        selector.set_retries(1).unwrap();
        assert_eq!(selector.get_group(G1), vec![STA_A]);
    }
}

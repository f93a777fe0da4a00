//! Engine configuration.

use bundleswap_common::PartyId;

/// Settlement engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The engine's own account identity on asset contracts. Senders
    /// grant their standing transfer authorizations to this party.
    pub custody_account: PartyId,
    /// Maximum flows accepted in one settlement.
    pub max_flows: usize,
    /// Bound on retained event records.
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            custody_account: PartyId::new("BUNDLESWAP_VAULT"),
            max_flows: 64,
            event_log_capacity: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_custody_account_is_well_formed() {
        let config = EngineConfig::default();
        assert!(config.custody_account.is_valid());
        assert!(config.max_flows > 0);
    }
}

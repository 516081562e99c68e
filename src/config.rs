//! Ledger configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::*;

/// What the transfer coordinator does with wallet balances once the audit
/// record is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Only the audit record is written; wallets keep their stored balances
    #[default]
    AuditOnly,
    /// Both wallets are rewritten with their post-transfer balances as a
    /// follow-up write that does not roll back the audit record on failure
    WriteBack,
}

/// Settings shared by the ledgers and the transfer coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Name of the audit ledger component
    pub audit_component: String,
    /// Channel the audit ledger is deployed on
    pub channel: String,
    /// Identity stamped on every record as `actionBy`
    pub action_by: String,
    /// Organization stamped on every record as `actionOrg` / `orgMSP`
    pub action_org: String,
    /// Action tag recorded for transfers
    pub distribute_action: String,
    pub balance_policy: BalancePolicy,
    pub allow_negative_amount: bool,
    pub allow_overdraft: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            audit_component: "transactions".to_string(),
            channel: "mychannel".to_string(),
            action_by: "ADMIN".to_string(),
            action_org: "Org1MSP".to_string(),
            distribute_action: "DISTRIBUTE".to_string(),
            balance_policy: BalancePolicy::AuditOnly,
            allow_negative_amount: true,
            allow_overdraft: true,
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document; omitted keys keep their defaults
    pub fn from_toml_str(source: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            toml::from_str(source).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the ledgers cannot operate with
    pub fn validate(&self) -> LedgerResult<()> {
        if self.audit_component.trim().is_empty() {
            return Err(LedgerError::Config(
                "audit_component cannot be empty".to_string(),
            ));
        }
        if self.channel.trim().is_empty() {
            return Err(LedgerError::Config("channel cannot be empty".to_string()));
        }
        if self.distribute_action.trim().is_empty() {
            return Err(LedgerError::Config(
                "distribute_action cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.balance_policy, BalancePolicy::AuditOnly);
    }

    #[test]
    fn test_partial_overrides() {
        let config = LedgerConfig::from_toml_str(
            r#"
            channel = "payments"
            balance_policy = "write_back"
            allow_overdraft = false
            "#,
        )
        .unwrap();

        assert_eq!(config.channel, "payments");
        assert_eq!(config.audit_component, "transactions");
        assert_eq!(config.balance_policy, BalancePolicy::WriteBack);
        assert!(!config.allow_overdraft);
        assert!(config.allow_negative_amount);
    }

    #[test]
    fn test_rejects_unknown_keys_and_empty_names() {
        assert!(matches!(
            LedgerConfig::from_toml_str("retries = 3"),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("audit_component = \"\""),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = LedgerConfig::from_file("/nonexistent/wallet-ledger.toml");
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}

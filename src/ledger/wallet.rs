//! Account ledger: wallet management

use tracing::{debug, info};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{check_amount, validate_key};

fn check_wallet_amounts(wallet: &Wallet) -> LedgerResult<()> {
    check_amount("balance", &wallet.balance)?;
    check_amount("transactionAmount", &wallet.transaction_amount)
}

/// Account ledger over its own world-state namespace
pub struct WalletContract<S: WorldState> {
    state: S,
}

impl<S: WorldState> WalletContract<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    /// Whether a wallet is stored under `id`
    pub async fn wallet_exists(&self, id: &str) -> LedgerResult<bool> {
        Ok(self.state.get_state(id).await?.is_some())
    }

    /// Store a new wallet
    pub async fn create_wallet(&self, wallet: &Wallet) -> LedgerResult<()> {
        validate_key(EntityKind::Wallet, &wallet.wallet_id)?;
        check_wallet_amounts(wallet)?;
        if self.wallet_exists(&wallet.wallet_id).await? {
            return Err(LedgerError::already_exists(
                EntityKind::Wallet,
                &wallet.wallet_id,
            ));
        }

        self.state
            .put_state(&wallet.wallet_id, wallet.to_bytes()?)
            .await?;
        info!(wallet_id = %wallet.wallet_id, balance = %wallet.balance, "wallet created");
        Ok(())
    }

    /// Read the wallet stored under `id`
    pub async fn read_wallet(&self, id: &str) -> LedgerResult<Wallet> {
        let bytes = self
            .state
            .get_state(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Wallet, id))?;
        Wallet::from_bytes(id, &bytes)
    }

    /// Replace an existing wallet
    pub async fn update_wallet(&self, wallet: &Wallet) -> LedgerResult<()> {
        check_wallet_amounts(wallet)?;
        if !self.wallet_exists(&wallet.wallet_id).await? {
            return Err(LedgerError::not_found(EntityKind::Wallet, &wallet.wallet_id));
        }

        self.state
            .put_state(&wallet.wallet_id, wallet.to_bytes()?)
            .await?;
        debug!(wallet_id = %wallet.wallet_id, balance = %wallet.balance, "wallet updated");
        Ok(())
    }

    /// Remove the wallet stored under `id`
    pub async fn delete_wallet(&self, id: &str) -> LedgerResult<()> {
        if !self.wallet_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Wallet, id));
        }
        self.state.del_state(id).await?;
        info!(wallet_id = %id, "wallet deleted");
        Ok(())
    }

    /// Every wallet in the namespace, in key order
    ///
    /// Fails on the first malformed entry; the scan is released either way.
    pub async fn list_all_wallets(&self) -> LedgerResult<Vec<Wallet>> {
        let scan = self.state.get_state_by_range("", "").await?;
        let mut wallets = Vec::new();
        for entry in scan {
            let (key, bytes) = entry?;
            wallets.push(Wallet::from_bytes(&key, &bytes)?);
        }
        debug!(count = wallets.len(), "listed wallets");
        Ok(wallets)
    }

    /// Underlying world state
    pub fn state(&self) -> &S {
        &self.state
    }
}

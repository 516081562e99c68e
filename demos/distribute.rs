//! Transfer walkthrough example

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wallet_ledger::utils::{LocalInvoker, MemoryWorldState};
use wallet_ledger::{
    BalancePolicy, LedgerConfig, ReconciliationEngine, TransactionContract, TransferCoordinator,
    Wallet,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig {
            balance_policy: BalancePolicy::WriteBack,
            ..LedgerConfig::default()
        },
    };
    println!("Wallet Ledger - Transfer Example\n");
    println!("Balance policy: {:?}\n", config.balance_policy);

    // 1. Deploy the audit ledger as a separate component with its own state
    let audit_state = MemoryWorldState::new();
    let audit = Arc::new(TransactionContract::with_config(
        audit_state.clone(),
        config.clone(),
    ));
    let invoker = LocalInvoker::new();
    invoker.register(&config.audit_component, &config.channel, audit.clone())?;
    audit.init_ledger().await?;

    // 2. Open two wallets
    let coordinator = TransferCoordinator::with_config(MemoryWorldState::new(), invoker, config);
    for (id, owner, balance) in [("A", "alice", 300), ("B", "bob", 500)] {
        let wallet = Wallet::new(
            id.to_string(),
            owner.to_string(),
            "standard".to_string(),
            balance.into(),
        );
        coordinator.wallets().create_wallet(&wallet).await?;
        println!("  Created wallet {id} for {owner} with balance {balance}");
    }
    println!();

    // 3. Transfer and inspect the audit trail
    let receipt = coordinator
        .distribute("A", "B", "100", "T1", "2022.10.27 13:37:25")
        .await?;
    println!(
        "  Transfer {}: {} -> {} ({}), sender {} -> {}, receiver {} -> {}",
        receipt.txn_id,
        receipt.sender,
        receipt.receiver,
        receipt.amount,
        receipt.sender_pre_balance,
        receipt.sender_post_balance,
        receipt.receiver_pre_balance,
        receipt.receiver_post_balance,
    );

    if let Err(e) = coordinator
        .distribute("A", "B", "abc", "T2", "2022.10.27 13:38:00")
        .await
    {
        println!("  Rejected transfer T2: {e}");
    }
    println!();

    for wallet in coordinator.wallets().list_all_wallets().await? {
        println!("  Wallet {} balance {}", wallet.wallet_id, wallet.balance);
    }

    let records = audit.list_all_transactions().await?;
    println!("\n  Audit ledger holds {} records", records.len());

    let report = ReconciliationEngine::new().audit(&audit).await?;
    println!(
        "  Reconciliation: {} records checked, consistent = {}",
        report.records_checked,
        report.is_consistent()
    );

    Ok(())
}

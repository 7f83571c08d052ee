//! The `wallet` command: balance, ledger, and top-ups.

use client::services::WalletService;
use shared::config::Config;
use shared::models::{NewTransaction, TransactionKind};
use uuid::Uuid;

use super::{build_store, resolve_user};

/// Applies an optional top-up, then prints the ledger and balance.
pub async fn run(
    config: &Config,
    user: Option<Uuid>,
    top_up_cents: Option<i64>,
) -> anyhow::Result<()> {
    let user = resolve_user(user)?;
    let service = WalletService::new(build_store(config)?);

    if let Some(amount) = top_up_cents {
        let entry = service
            .record(NewTransaction {
                user_id: user,
                kind: TransactionKind::TopUp,
                amount_cents: amount,
                reference_id: None,
            })
            .await?;
        println!("credited {}c ({})", entry.amount_cents, entry.id);
    }

    for entry in service.ledger(user).await? {
        println!(
            "{} {:>8}c {}",
            entry.created_at,
            entry.amount_cents,
            entry.kind.as_str()
        );
    }
    println!("balance: {}c", service.balance(user).await?);
    Ok(())
}

//! Wallet service layer.
//!
//! The wallet is an append-only ledger; the balance is always a fold over
//! the entries, never a stored counter a client could race on.

use std::sync::Arc;
use uuid::Uuid;

use shared::models::{ClientError, ClientResult, NewTransaction, WalletTransaction, balance_cents};

use crate::backend::DataStore;

/// Service for the wallet ledger.
#[derive(Clone)]
pub struct WalletService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl WalletService {
    /// Creates a new wallet service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Current balance in cents.
    ///
    /// # Errors
    /// Returns an error if the ledger query fails.
    pub async fn balance(&self, user_id: Uuid) -> ClientResult<i64> {
        let ledger = self.store.list_transactions(user_id).await?;
        Ok(balance_cents(&ledger))
    }

    /// Full ledger, oldest entry first.
    ///
    /// # Errors
    /// Returns an error if the ledger query fails.
    pub async fn ledger(&self, user_id: Uuid) -> ClientResult<Vec<WalletTransaction>> {
        self.store.list_transactions(user_id).await
    }

    /// Appends a ledger entry.
    ///
    /// # Errors
    /// Returns a validation error for a zero amount, and propagates backend
    /// failures.
    pub async fn record(&self, draft: NewTransaction) -> ClientResult<WalletTransaction> {
        if draft.amount_cents == 0 {
            return Err(ClientError::validation(
                "ledger entries must move a non-zero amount",
            ));
        }
        self.store.insert_transaction(draft).await
    }
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use shared::models::TransactionKind;

    #[tokio::test]
    async fn balance_folds_the_ledger() {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.seed_profile("ada").await.id;
        let service = WalletService::new(backend);

        service
            .record(NewTransaction {
                user_id: user,
                kind: TransactionKind::TopUp,
                amount_cents: 1000,
                reference_id: None,
            })
            .await
            .unwrap();
        service
            .record(NewTransaction {
                user_id: user,
                kind: TransactionKind::Gift,
                amount_cents: -250,
                reference_id: None,
            })
            .await
            .unwrap();

        assert_eq!(service.balance(user).await.unwrap(), 750);
        assert_eq!(service.ledger(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.seed_profile("ada").await.id;
        let service = WalletService::new(backend);

        let result = service
            .record(NewTransaction {
                user_id: user,
                kind: TransactionKind::TopUp,
                amount_cents: 0,
                reference_id: None,
            })
            .await;

        assert!(matches!(result, Err(ClientError::Validation { .. })));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    TopUp,
    PostUnlock,
    Gift,
    Payout,
}

impl TransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::PostUnlock => "post_unlock",
            Self::Gift => "gift",
            Self::Payout => "payout",
        }
    }
}

/// One append-only wallet ledger entry.
///
/// Amounts are signed cents: credits are positive, debits negative. The
/// balance is a fold over the ledger, never a stored counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    /// Owner of the wallet.
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Signed amount in cents.
    pub amount_cents: i64,
    /// The entity this entry refers to (post, gift, payout request).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
    pub created_at: Timestamp,
}

/// Request payload for appending a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Signed amount in cents.
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
}

/// Folds a ledger into the current balance in cents.
#[must_use]
pub fn balance_cents(ledger: &[WalletTransaction]) -> i64 {
    ledger.iter().map(|entry| entry.amount_cents).sum()
}

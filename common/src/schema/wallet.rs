use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,
    pub balance: i64,
    pub escrow: i64,
    pub total_earned: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Public view of a wallet, as returned by the balance endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub balance: i64,
    pub escrow: i64,
    pub total_earned: i64,
}

impl From<&Wallet> for WalletBalance {
    fn from(wallet: &Wallet) -> Self {
        WalletBalance {
            balance: wallet.balance,
            escrow: wallet.escrow,
            total_earned: wallet.total_earned,
        }
    }
}

/// Stored balance compared with the balance derived from transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub user_id: i64,
    pub stored_balance: i64,
    pub derived_balance: i64,
    pub discrepancy: i64,
}

impl Reconciliation {
    pub fn new(user_id: i64, stored_balance: i64, derived_balance: i64) -> Self {
        Reconciliation {
            user_id,
            stored_balance,
            derived_balance,
            discrepancy: stored_balance - derived_balance,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.discrepancy == 0
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Sale,
    Purchase,
    EscrowHold,
    EscrowRelease,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
            TransactionType::EscrowHold => "escrow_hold",
            TransactionType::EscrowRelease => "escrow_release",
            TransactionType::Refund => "refund",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            "sale" => Some(TransactionType::Sale),
            "purchase" => Some(TransactionType::Purchase),
            "escrow_hold" => Some(TransactionType::EscrowHold),
            "escrow_release" => Some(TransactionType::EscrowRelease),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "rejected" => Some(TransactionStatus::Rejected),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }
}

/// Admin decision on a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    Reject,
}

/// Outcome of applying an [`AdminAction`]: the status to store and the amount
/// to add to the owner's wallet balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: TransactionStatus,
    pub wallet_delta: i64,
}

/// Maps an admin action on a transaction to its new status and wallet delta.
///
/// Only pending deposits and withdrawals can be finalized. Withdrawals are
/// debited when requested, so approving one moves no money and rejecting one
/// refunds it.
pub fn transition(
    kind: TransactionType,
    status: TransactionStatus,
    action: AdminAction,
    amount: i64,
) -> Result<Transition, LedgerError> {
    // (credit on approve, credit on reject)
    let (approve_delta, reject_delta) = match kind {
        TransactionType::Deposit => (amount, 0),
        TransactionType::Withdraw => (0, amount),
        other => {
            return Err(LedgerError::WrongType {
                expected: "deposit or withdraw",
                actual: other,
            });
        }
    };
    if status != TransactionStatus::Pending {
        return Err(LedgerError::AlreadyProcessed(status));
    }
    if amount <= 0 {
        return Err(LedgerError::Validation(
            "Transaction amount must be positive".to_string(),
        ));
    }

    Ok(match action {
        AdminAction::Approve => Transition {
            status: TransactionStatus::Completed,
            wallet_delta: approve_delta,
        },
        AdminAction::Reject => Transition {
            status: TransactionStatus::Rejected,
            wallet_delta: reject_delta,
        },
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub method: String,
    pub description: String,
    pub ticket_id: Option<i64>,
    pub bank_account_id: Option<i64>,
    pub admin_note: Option<String>,
    pub payment_ref: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Transaction {
    /// Contribution of this transaction to the owner's stored balance.
    ///
    /// Withdrawals count while pending because the funds leave the wallet at
    /// request time.
    pub fn balance_effect(&self) -> i64 {
        use TransactionStatus::*;
        use TransactionType::*;
        match (self.kind, self.status) {
            (Deposit | Sale | Refund | EscrowRelease, Completed) => self.amount,
            (Purchase | EscrowHold, Completed) => -self.amount,
            (Withdraw, Pending | Completed) => -self.amount,
            _ => 0,
        }
    }
}

/// A transaction about to be inserted; always starts out pending.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub kind: TransactionType,
    pub amount: i64,
    pub method: String,
    pub description: String,
    pub ticket_id: Option<i64>,
    pub bank_account_id: Option<i64>,
    pub payment_ref: Option<String>,
}

impl NewTransaction {
    pub fn new(user_id: i64, kind: TransactionType, amount: i64, method: &str) -> Self {
        NewTransaction {
            user_id,
            kind,
            amount,
            method: method.to_string(),
            description: String::new(),
            ticket_id: None,
            bank_account_id: None,
            payment_ref: None,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if self.method.trim().is_empty() {
            return Err(LedgerError::Validation("Method is required".to_string()));
        }
        if self.kind == TransactionType::Withdraw && self.bank_account_id.is_none() {
            return Err(LedgerError::Validation(
                "Bank account is required for withdrawals".to_string(),
            ));
        }
        Ok(())
    }
}

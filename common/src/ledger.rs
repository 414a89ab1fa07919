use crate::db::Database;
use crate::error::LedgerError;
use crate::schema::{
    AdminAction, AdminContext, AuthClaims, NewTransaction, Reconciliation, Transaction,
    TransactionStatus, TransactionType, WalletBalance, transition,
};

/// Most recent transactions shown to a user.
pub const USER_HISTORY_LIMIT: i64 = 50;
/// Size of one page of the admin review queue.
pub const ADMIN_QUEUE_LIMIT: i64 = 200;

pub const WITHDRAW_APPROVED_NOTE: &str = "Withdrawal approved and transferred";

/// Wallet and transaction operations. Every mutation that touches both a
/// wallet and a transaction runs inside one database transaction.
pub struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Ledger { db }
    }

    pub async fn approve_deposit(
        &self,
        admin: &AdminContext,
        transaction_id: i64,
    ) -> Result<Transaction, LedgerError> {
        let note = format!("Deposit approved by {}", admin.username());
        self.finalize(
            admin,
            transaction_id,
            TransactionType::Deposit,
            AdminAction::Approve,
            Some(note.as_str()),
            None,
        )
        .await
    }

    pub async fn reject_deposit(
        &self,
        admin: &AdminContext,
        transaction_id: i64,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        let reason = require_reason(reason)?;
        self.finalize(
            admin,
            transaction_id,
            TransactionType::Deposit,
            AdminAction::Reject,
            Some(reason),
            Some(reason),
        )
        .await
    }

    pub async fn approve_withdraw(
        &self,
        admin: &AdminContext,
        transaction_id: i64,
    ) -> Result<Transaction, LedgerError> {
        self.finalize(
            admin,
            transaction_id,
            TransactionType::Withdraw,
            AdminAction::Approve,
            Some(WITHDRAW_APPROVED_NOTE),
            None,
        )
        .await
    }

    /// Rejects a pending withdrawal and refunds its amount to the wallet.
    pub async fn reject_withdraw(
        &self,
        admin: &AdminContext,
        transaction_id: i64,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        let reason = require_reason(reason)?;
        self.finalize(
            admin,
            transaction_id,
            TransactionType::Withdraw,
            AdminAction::Reject,
            Some(reason),
            Some(reason),
        )
        .await
    }

    async fn finalize(
        &self,
        admin: &AdminContext,
        transaction_id: i64,
        expected: TransactionType,
        action: AdminAction,
        admin_note: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.db.begin().await?;

        let current = Database::get_transaction(&mut *tx, transaction_id)
            .await?
            .ok_or(LedgerError::NotFound {
                entity: "Transaction",
                id: transaction_id,
            })?;

        if current.kind != expected {
            return Err(LedgerError::WrongType {
                expected: expected.as_str(),
                actual: current.kind,
            });
        }

        let next = transition(current.kind, current.status, action, current.amount)?;
        let completed_at =
            (next.status == TransactionStatus::Completed).then(|| chrono::Utc::now().naive_utc());

        // Compare-and-swap on `pending`: a concurrent finalizer that got here
        // first leaves zero rows to update.
        let updated = Database::finalize_transaction(
            &mut *tx,
            transaction_id,
            next.status,
            admin_note,
            error_message,
            completed_at,
        )
        .await?;
        let Some(updated) = updated else {
            let status = Database::get_transaction(&mut *tx, transaction_id)
                .await?
                .map(|t| t.status)
                .unwrap_or(next.status);
            log::warn!(
                "Transaction {} was finalized concurrently, {:?} by {} dropped",
                transaction_id,
                action,
                admin.username()
            );
            return Err(LedgerError::AlreadyProcessed(status));
        };

        if next.wallet_delta > 0 {
            Database::credit_wallet(&mut *tx, updated.user_id, next.wallet_delta).await?;
        }

        tx.commit().await?;

        log::info!(
            "{} {:?} {} #{} ({}), wallet delta {} for user {}",
            admin.username(),
            action,
            expected.as_str(),
            updated.id,
            updated.amount,
            next.wallet_delta,
            updated.user_id
        );
        Ok(updated)
    }

    pub async fn request_deposit(
        &self,
        claims: &AuthClaims,
        amount: i64,
        method: &str,
        description: Option<String>,
        payment_ref: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let mut new = NewTransaction::new(claims.user_id, TransactionType::Deposit, amount, method);
        new.description = description.unwrap_or_default();
        new.payment_ref = payment_ref;
        new.validate()?;

        let mut tx = self.db.begin().await?;
        let created = Database::insert_transaction(&mut *tx, &new).await?;
        tx.commit().await?;

        log::info!(
            "User {} requested deposit #{} of {}",
            claims.username,
            created.id,
            created.amount
        );
        Ok(created)
    }

    /// Debits the wallet and records a pending withdrawal in one step.
    pub async fn request_withdraw(
        &self,
        claims: &AuthClaims,
        amount: i64,
        bank_account_id: Option<i64>,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let mut new = NewTransaction::new(
            claims.user_id,
            TransactionType::Withdraw,
            amount,
            "bank_transfer",
        );
        new.bank_account_id = bank_account_id;
        new.description = description.unwrap_or_default();
        new.validate()?;

        let mut tx = self.db.begin().await?;
        let debited = Database::debit_wallet(&mut *tx, claims.user_id, amount).await?;
        if debited.is_none() {
            tx.rollback().await?;
            let available = self
                .db
                .get_wallet(claims.user_id)
                .await?
                .map(|w| w.balance)
                .unwrap_or(0);
            log::warn!(
                "User {} requested withdrawal of {} with balance {}",
                claims.username,
                amount,
                available
            );
            return Err(LedgerError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        let created = Database::insert_transaction(&mut *tx, &new).await?;
        tx.commit().await?;

        log::info!(
            "User {} requested withdrawal #{} of {}",
            claims.username,
            created.id,
            created.amount
        );
        Ok(created)
    }

    /// Zeros when the user has no wallet yet.
    pub async fn wallet_balance(&self, user_id: i64) -> Result<WalletBalance, LedgerError> {
        let wallet = self.db.get_wallet(user_id).await?;
        Ok(wallet.as_ref().map(WalletBalance::from).unwrap_or_default())
    }

    pub async fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self
            .db
            .get_transactions_by_user(user_id, USER_HISTORY_LIMIT)
            .await?)
    }

    pub async fn admin_list_transactions(
        &self,
        _admin: &AdminContext,
        status: Option<TransactionStatus>,
        kind: Option<TransactionType>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self
            .db
            .get_transactions_filtered(status, kind, ADMIN_QUEUE_LIMIT)
            .await?)
    }

    /// Compares the stored balance with the one implied by the user's history.
    pub async fn reconcile(
        &self,
        _admin: &AdminContext,
        user_id: i64,
    ) -> Result<Reconciliation, LedgerError> {
        if self.db.get_user_by_id(user_id).await?.is_none() {
            return Err(LedgerError::NotFound {
                entity: "User",
                id: user_id,
            });
        }
        let stored = self.wallet_balance(user_id).await?.balance;
        let derived = self
            .db
            .get_all_transactions_by_user(user_id)
            .await?
            .iter()
            .map(Transaction::balance_effect)
            .sum();

        let report = Reconciliation::new(user_id, stored, derived);
        if !report.is_consistent() {
            log::warn!(
                "Wallet of user {} out of balance: stored {}, derived {}",
                user_id,
                stored,
                derived
            );
        }
        Ok(report)
    }
}

fn require_reason(reason: &str) -> Result<&str, LedgerError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::Validation(
            "Rejection reason is required".to_string(),
        ));
    }
    Ok(reason)
}

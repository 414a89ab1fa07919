use std::time::Duration;

use common::{
    AdminContext, AuthClaims, Database, Ledger, LedgerError, TransactionStatus, TransactionType,
    User, UserRole, WalletBalance,
};

async fn add_user(db: &Database, username: &str, role: UserRole) -> AuthClaims {
    // Hashing is irrelevant here and slow in debug builds.
    let user = User {
        id: 0,
        username: username.to_string(),
        email: format!("{username}@mail.io"),
        password_hash: "unused".to_string(),
        role,
        created_at: None,
        updated_at: None,
    };
    db.save_user(&user).await.unwrap().claims()
}

struct Fixture {
    db: Database,
    admin: AdminContext,
    alice: AuthClaims,
}

async fn fixture() -> Fixture {
    fixture_on(Database::in_memory().await.unwrap()).await
}

async fn fixture_on(db: Database) -> Fixture {
    let admin_claims = add_user(&db, "root", UserRole::Admin).await;
    let alice = add_user(&db, "alice", UserRole::User).await;
    Fixture {
        db,
        admin: AdminContext::try_from(&admin_claims).unwrap(),
        alice,
    }
}

#[tokio::test]
async fn approving_deposit_creates_wallet_once() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap(),
        WalletBalance::default()
    );

    let deposit = ledger
        .request_deposit(&f.alice, 100_000, "bank_transfer", None, Some("ref-1".into()))
        .await
        .unwrap();
    assert_eq!(deposit.status, TransactionStatus::Pending);
    assert!(f.db.get_wallet(f.alice.user_id).await.unwrap().is_none());

    let approved = ledger.approve_deposit(&f.admin, deposit.id).await.unwrap();
    assert_eq!(approved.status, TransactionStatus::Completed);
    assert!(approved.completed_at.is_some());
    assert_eq!(approved.admin_note.as_deref(), Some("Deposit approved by root"));

    let balance = ledger.wallet_balance(f.alice.user_id).await.unwrap();
    assert_eq!(
        balance,
        WalletBalance {
            balance: 100_000,
            escrow: 0,
            total_earned: 0
        }
    );

    let err = ledger.approve_deposit(&f.admin, deposit.id).await.unwrap_err();
    assert!(err.is_invalid_state(), "{err:?}");
    assert!(matches!(
        err,
        LedgerError::AlreadyProcessed(TransactionStatus::Completed)
    ));
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        100_000
    );
}

#[tokio::test]
async fn rejecting_deposit_keeps_balance() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let first = ledger
        .request_deposit(&f.alice, 20_000, "momo", None, None)
        .await
        .unwrap();
    ledger.approve_deposit(&f.admin, first.id).await.unwrap();

    let second = ledger
        .request_deposit(&f.alice, 70_000, "momo", Some("top up".into()), None)
        .await
        .unwrap();

    let err = ledger.reject_deposit(&f.admin, second.id, "   ").await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let rejected = ledger
        .reject_deposit(&f.admin, second.id, "no transfer received")
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);
    assert_eq!(rejected.error_message.as_deref(), Some("no transfer received"));
    assert!(rejected.completed_at.is_none());
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        20_000
    );

    // rejected is terminal
    let err = ledger.approve_deposit(&f.admin, second.id).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::AlreadyProcessed(TransactionStatus::Rejected)
    ));
}

#[tokio::test]
async fn rejecting_withdraw_refunds_amount() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let deposit = ledger
        .request_deposit(&f.alice, 80_000, "bank_transfer", None, None)
        .await
        .unwrap();
    ledger.approve_deposit(&f.admin, deposit.id).await.unwrap();

    let withdraw = ledger
        .request_withdraw(&f.alice, 50_000, Some(7), None)
        .await
        .unwrap();
    assert_eq!(withdraw.status, TransactionStatus::Pending);
    assert_eq!(withdraw.bank_account_id, Some(7));
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        30_000
    );

    let rejected = ledger
        .reject_withdraw(&f.admin, withdraw.id, "insufficient proof")
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);
    assert_eq!(rejected.admin_note.as_deref(), Some("insufficient proof"));
    assert_eq!(rejected.error_message.as_deref(), Some("insufficient proof"));
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        80_000
    );

    let err = ledger
        .reject_withdraw(&f.admin, withdraw.id, "again")
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        80_000
    );
}

#[tokio::test]
async fn rejecting_withdraw_without_wallet_creates_one() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    // A withdraw recorded outside the request flow, e.g. by an import.
    let mut tx = f.db.begin().await.unwrap();
    let mut new = common::NewTransaction::new(
        f.alice.user_id,
        TransactionType::Withdraw,
        50_000,
        "bank_transfer",
    );
    new.bank_account_id = Some(1);
    let withdraw = Database::insert_transaction(&mut *tx, &new).await.unwrap();
    tx.commit().await.unwrap();

    ledger
        .reject_withdraw(&f.admin, withdraw.id, "insufficient proof")
        .await
        .unwrap();
    let wallet = f.db.get_wallet(f.alice.user_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 50_000);
    assert_eq!(wallet.escrow, 0);
    assert_eq!(wallet.total_earned, 0);
}

#[tokio::test]
async fn approving_withdraw_moves_no_money() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let deposit = ledger
        .request_deposit(&f.alice, 60_000, "bank_transfer", None, None)
        .await
        .unwrap();
    ledger.approve_deposit(&f.admin, deposit.id).await.unwrap();
    let withdraw = ledger
        .request_withdraw(&f.alice, 60_000, Some(2), Some("payout".into()))
        .await
        .unwrap();
    let before = ledger.wallet_balance(f.alice.user_id).await.unwrap();

    let approved = ledger.approve_withdraw(&f.admin, withdraw.id).await.unwrap();
    assert_eq!(approved.status, TransactionStatus::Completed);
    assert!(approved.completed_at.is_some());
    assert_eq!(
        approved.admin_note.as_deref(),
        Some(common::WITHDRAW_APPROVED_NOTE)
    );
    assert_eq!(ledger.wallet_balance(f.alice.user_id).await.unwrap(), before);
    assert_eq!(before.balance, 0);
}

#[tokio::test]
async fn wrong_type_and_missing_transactions_are_distinct() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let deposit = ledger
        .request_deposit(&f.alice, 1_000, "momo", None, None)
        .await
        .unwrap();

    let err = ledger.approve_withdraw(&f.admin, deposit.id).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::WrongType {
            expected: "withdraw",
            actual: TransactionType::Deposit
        }
    ));
    let err = ledger
        .reject_withdraw(&f.admin, deposit.id, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::WrongType { .. }));

    let err = ledger.approve_deposit(&f.admin, 9_999).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NotFound {
            entity: "Transaction",
            id: 9_999
        }
    ));

    // the deposit is still pending after the failed attempts
    let approved = ledger.approve_deposit(&f.admin, deposit.id).await.unwrap();
    assert_eq!(approved.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn withdraw_requires_funds_and_bank_account() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let err = ledger
        .request_withdraw(&f.alice, 10, Some(1), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            available: 0,
            requested: 10
        }
    ));

    let err = ledger
        .request_withdraw(&f.alice, 10, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .request_deposit(&f.alice, -5, "momo", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    assert!(ledger.list_transactions(f.alice.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_approvals_credit_once() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let deposit = ledger
        .request_deposit(&f.alice, 100_000, "bank_transfer", None, None)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        ledger.approve_deposit(&f.admin, deposit.id),
        ledger.approve_deposit(&f.admin, deposit.id)
    );
    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let failure = a.err().or(b.err()).unwrap();
    assert!(failure.is_invalid_state(), "{failure:?}");

    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        100_000
    );
}

// The in-memory pool has one connection, so the test above never sees two
// writers at once. A file database gives each request its own connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_file_database_get_domain_errors() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let db = Database::new(&url, Duration::from_secs(5)).await.unwrap();
    let f = fixture_on(db).await;
    let ledger = Ledger::new(&f.db);

    for round in 1..=20 {
        let deposit = ledger
            .request_deposit(&f.alice, 1_000, "bank_transfer", None, None)
            .await
            .unwrap();
        let (a, b) = tokio::join!(
            ledger.approve_deposit(&f.admin, deposit.id),
            ledger.approve_deposit(&f.admin, deposit.id)
        );
        let failure = match (a, b) {
            (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
            other => panic!("round {round}: expected one winner, got {other:?}"),
        };
        assert!(
            matches!(
                failure,
                LedgerError::AlreadyProcessed(TransactionStatus::Completed)
            ),
            "round {round}: {failure:?}"
        );
    }
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        20_000
    );

    let (a, b) = tokio::join!(
        ledger.request_withdraw(&f.alice, 15_000, Some(1), None),
        ledger.request_withdraw(&f.alice, 15_000, Some(1), None)
    );
    let failure = match (a, b) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        other => panic!("expected one withdrawal to succeed, got {other:?}"),
    };
    assert!(
        matches!(
            failure,
            LedgerError::InsufficientFunds {
                available: 5_000,
                requested: 15_000
            }
        ),
        "{failure:?}"
    );
    assert_eq!(
        ledger.wallet_balance(f.alice.user_id).await.unwrap().balance,
        5_000
    );
}

#[tokio::test]
async fn history_is_newest_first_and_capped() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let mut last_id = 0;
    for i in 1..=55 {
        last_id = ledger
            .request_deposit(&f.alice, i, "momo", None, None)
            .await
            .unwrap()
            .id;
    }

    let history = ledger.list_transactions(f.alice.user_id).await.unwrap();
    assert_eq!(history.len(), common::USER_HISTORY_LIMIT as usize);
    assert_eq!(history[0].id, last_id);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));
}

#[tokio::test]
async fn admin_queue_filters_by_status_and_type() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let d1 = ledger
        .request_deposit(&f.alice, 500, "momo", None, None)
        .await
        .unwrap();
    ledger
        .request_deposit(&f.alice, 700, "momo", None, None)
        .await
        .unwrap();
    ledger.approve_deposit(&f.admin, d1.id).await.unwrap();
    let w = ledger
        .request_withdraw(&f.alice, 300, Some(1), None)
        .await
        .unwrap();

    let pending = ledger
        .admin_list_transactions(&f.admin, Some(TransactionStatus::Pending), None)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    let pending_withdrawals = ledger
        .admin_list_transactions(
            &f.admin,
            Some(TransactionStatus::Pending),
            Some(TransactionType::Withdraw),
        )
        .await
        .unwrap();
    assert_eq!(pending_withdrawals.len(), 1);
    assert_eq!(pending_withdrawals[0].id, w.id);

    let all = ledger
        .admin_list_transactions(&f.admin, None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn reconciliation_tracks_every_flow() {
    let f = fixture().await;
    let ledger = Ledger::new(&f.db);

    let d1 = ledger
        .request_deposit(&f.alice, 100_000, "bank_transfer", None, None)
        .await
        .unwrap();
    ledger.approve_deposit(&f.admin, d1.id).await.unwrap();
    let d2 = ledger
        .request_deposit(&f.alice, 40_000, "bank_transfer", None, None)
        .await
        .unwrap();
    ledger.reject_deposit(&f.admin, d2.id, "bogus").await.unwrap();
    let w1 = ledger
        .request_withdraw(&f.alice, 30_000, Some(1), None)
        .await
        .unwrap();
    ledger.approve_withdraw(&f.admin, w1.id).await.unwrap();
    let w2 = ledger
        .request_withdraw(&f.alice, 20_000, Some(1), None)
        .await
        .unwrap();
    ledger.reject_withdraw(&f.admin, w2.id, "blurry").await.unwrap();
    ledger
        .request_withdraw(&f.alice, 10_000, Some(1), None)
        .await
        .unwrap();

    let report = ledger.reconcile(&f.admin, f.alice.user_id).await.unwrap();
    assert_eq!(report.stored_balance, 60_000);
    assert_eq!(report.derived_balance, 60_000);
    assert!(report.is_consistent());

    // money appearing without a ledger entry
    let mut tx = f.db.begin().await.unwrap();
    Database::credit_wallet(&mut *tx, f.alice.user_id, 5).await.unwrap();
    tx.commit().await.unwrap();

    let report = ledger.reconcile(&f.admin, f.alice.user_id).await.unwrap();
    assert_eq!(report.discrepancy, 5);
    assert!(!report.is_consistent());

    let err = ledger.reconcile(&f.admin, 404).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "User", .. }));
}

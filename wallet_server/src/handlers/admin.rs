use actix_web::{HttpResponse, get, post, web};
use common::{AdminContext, AuthClaims, LedgerError, TransactionStatus, TransactionType};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct AdminTransactionQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[post("/deposit/{id}/approve")]
pub async fn approve_deposit(
    path: web::Path<i64>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;
    let transaction = app_state
        .ledger()
        .approve_deposit(&admin, path.into_inner())
        .await?;
    app_state.views.invalidate(transaction.user_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Deposit of {} approved", transaction.amount),
    })))
}

#[post("/deposit/{id}/reject")]
pub async fn reject_deposit(
    path: web::Path<i64>,
    body: web::Json<RejectBody>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;
    let transaction = app_state
        .ledger()
        .reject_deposit(&admin, path.into_inner(), &body.reason)
        .await?;
    app_state.views.invalidate(transaction.user_id).await;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[post("/withdraw/{id}/approve")]
pub async fn approve_withdraw(
    path: web::Path<i64>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;
    let transaction = app_state
        .ledger()
        .approve_withdraw(&admin, path.into_inner())
        .await?;
    app_state.views.invalidate(transaction.user_id).await;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[post("/withdraw/{id}/reject")]
pub async fn reject_withdraw(
    path: web::Path<i64>,
    body: web::Json<RejectBody>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;
    let transaction = app_state
        .ledger()
        .reject_withdraw(&admin, path.into_inner(), &body.reason)
        .await?;
    app_state.views.invalidate(transaction.user_id).await;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/transactions")]
pub async fn list_transactions(
    query: web::Query<AdminTransactionQuery>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(TransactionStatus::parse(s).ok_or_else(|| {
            LedgerError::Validation(
                "Transaction status must be one of 'pending', 'completed', 'rejected' or 'cancelled'."
                    .to_string(),
            )
        })?),
        None => None,
    };
    let kind = match query.kind.as_deref() {
        Some(k) => Some(TransactionType::parse(k).ok_or_else(|| {
            LedgerError::Validation(format!("Unknown transaction type '{}'.", k))
        })?),
        None => None,
    };

    let transactions = app_state
        .ledger()
        .admin_list_transactions(&admin, status, kind)
        .await?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[get("/wallet/{user_id}/reconcile")]
pub async fn reconcile_wallet(
    path: web::Path<i64>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let admin = AdminContext::try_from(&claims)?;
    let report = app_state
        .ledger()
        .reconcile(&admin, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

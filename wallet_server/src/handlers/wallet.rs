use actix_web::{HttpResponse, get, post, web};
use common::{AuthClaims, WalletBalance};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub amount: i64,
    pub method: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub amount: i64,
    #[serde(default)]
    pub bank_account_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Never fails: storage errors degrade to an all-zero balance.
#[get("/balance")]
pub async fn get_balance(claims: AuthClaims, app_state: web::Data<AppState>) -> HttpResponse {
    let generation = app_state.views.generation(claims.user_id).await;
    if let Some(cached) = app_state.views.balance(claims.user_id).await {
        return HttpResponse::Ok().json(cached);
    }

    match app_state.ledger().wallet_balance(claims.user_id).await {
        Ok(balance) => {
            app_state
                .views
                .store_balance(claims.user_id, generation, balance)
                .await;
            HttpResponse::Ok().json(balance)
        }
        Err(e) => {
            log::error!("Failed to get balance for user {}: {}", claims.user_id, e);
            HttpResponse::Ok().json(WalletBalance::default())
        }
    }
}

#[get("/transactions")]
pub async fn get_transactions(
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let generation = app_state.views.generation(claims.user_id).await;
    if let Some(cached) = app_state.views.transactions(claims.user_id).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let transactions = app_state
        .ledger()
        .list_transactions(claims.user_id)
        .await
        .inspect_err(|e| {
            log::error!("Failed to get transactions for user {}: {}", claims.user_id, e)
        })?;
    app_state
        .views
        .store_transactions(claims.user_id, generation, transactions.clone())
        .await;
    Ok(HttpResponse::Ok().json(transactions))
}

#[post("/deposit")]
pub async fn request_deposit(
    body: web::Json<DepositRequest>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let DepositRequest {
        amount,
        method,
        description,
        payment_ref,
    } = body.into_inner();
    let transaction = app_state
        .ledger()
        .request_deposit(&claims, amount, &method, description, payment_ref)
        .await?;
    app_state.views.invalidate(claims.user_id).await;

    Ok(HttpResponse::Created().json(transaction))
}

#[post("/withdraw")]
pub async fn request_withdraw(
    body: web::Json<WithdrawRequest>,
    claims: AuthClaims,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let WithdrawRequest {
        amount,
        bank_account_id,
        description,
    } = body.into_inner();
    let transaction = app_state
        .ledger()
        .request_withdraw(&claims, amount, bank_account_id, description)
        .await?;
    app_state.views.invalidate(claims.user_id).await;

    Ok(HttpResponse::Created().json(transaction))
}

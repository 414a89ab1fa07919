use crate::error::{ApiError, error_body};
use crate::state::AppState;
use actix_jwt_auth_middleware::TokenSigner;
use actix_web::Error;
use actix_web::{HttpResponse, error::InternalError, http::StatusCode, post, web};
use common::{AuthClaims, LedgerError};
use jwt_compact::alg::Ed25519;

#[derive(Debug, serde::Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[post("/login")]
pub async fn login(
    login_data: web::Json<LoginData>,
    app_state: web::Data<AppState>,
    cookie_signer: web::Data<TokenSigner<AuthClaims, Ed25519>>,
) -> Result<HttpResponse, Error> {
    let user = app_state
        .db
        .get_user(&login_data.username)
        .await
        .map_err(|e| ApiError(LedgerError::from(e)))?
        .ok_or_else(|| {
            log::warn!("Failed to get User with username: {}", login_data.username);
            ApiError(LedgerError::InvalidCredentials)
        })?;

    if let Err(err) = user.verify_password(&login_data.password) {
        log::warn!(
            "Invalid password for user {}: {:?}",
            login_data.username,
            err
        );
        return Err(ApiError(LedgerError::InvalidCredentials).into());
    }

    let claims = user.claims();
    let access_cookie = cookie_signer.create_access_cookie(&claims).map_err(|err| {
        log::error!("Failed to create access token: {:?}", err);
        token_error()
    })?;

    let refresh_cookie = cookie_signer.create_refresh_cookie(&claims).map_err(|err| {
        log::error!("Failed to create refresh token: {:?}", err);
        token_error()
    })?;

    log::info!("User {} logged in", user.username);
    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .body("Login successful."))
}

fn token_error() -> InternalError<&'static str> {
    InternalError::from_response(
        "Token error",
        error_body(StatusCode::INTERNAL_SERVER_ERROR, "Token error"),
    )
}

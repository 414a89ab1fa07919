mod config;
mod error;
mod handlers;
mod state;

use actix_web::{HttpServer, web};
use dotenv::dotenv;
use ed25519_compact::KeyPair;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

/// Builds the application: public routes, JWT protected `/wallet` routes and
/// the admin-only `/admin` scope.
macro_rules! wallet_app {
    ($data:expr, $public_key:expr, $secret_key:expr) => {{
        use actix_jwt_auth_middleware::{Authority, TokenSigner, use_jwt::UseJWTOnApp};
        use actix_state_guards::UseStateGuardOnScope;
        use actix_web::{App, middleware::Logger, web};
        use common::{AuthClaims, LedgerError};
        use jwt_compact::alg::Ed25519;

        let authority = Authority::<AuthClaims, Ed25519, _, _>::new()
            .refresh_authorizer(|| async move { Ok(()) })
            .token_signer(Some(
                TokenSigner::new()
                    .signing_key($secret_key.clone())
                    .algorithm(Ed25519)
                    .build()
                    .expect("Failed to generate TokenSigner"),
            ))
            .verifying_key($public_key)
            .build()
            .expect("Failed to create Authority");

        App::new()
            .app_data($data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(crate::handlers::index)
            .service(crate::handlers::login)
            .use_jwt(
                authority,
                web::scope("")
                    .service(
                        web::scope("/wallet")
                            .service(crate::handlers::get_balance)
                            .service(crate::handlers::get_transactions)
                            .service(crate::handlers::request_deposit)
                            .service(crate::handlers::request_withdraw),
                    )
                    .use_state_guard(
                        |claims: AuthClaims| async move {
                            if claims.is_admin() {
                                Ok(())
                            } else {
                                log::warn!("User {} denied admin access", claims.username);
                                Err(crate::error::ApiError(LedgerError::Unauthorized))
                            }
                        },
                        web::scope("/admin")
                            .service(crate::handlers::approve_deposit)
                            .service(crate::handlers::reject_deposit)
                            .service(crate::handlers::approve_withdraw)
                            .service(crate::handlers::reject_withdraw)
                            .service(crate::handlers::list_transactions)
                            .service(crate::handlers::reconcile_wallet),
                    ),
            )
    }};
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("debug");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::other(e.to_string())
    })?;

    let state = config.create_app_state().await.map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::other(e.to_string())
    })?;

    log::info!("App state initialized successfully");

    let data = web::Data::new(state);

    //Authorization
    let KeyPair {
        pk: public_key,
        sk: secret_key,
    } = KeyPair::generate();

    log::info!("Listening on {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || wallet_app!(data, public_key, secret_key))
        .bind((config.bind_addr.as_str(), config.port))?
        .run()
        .await
}

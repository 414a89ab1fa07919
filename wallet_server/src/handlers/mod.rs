mod admin;
mod auth;
mod wallet;

use actix_web::{HttpResponse, Responder, get};
pub use admin::*;
pub use auth::*;
pub use wallet::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to Ticket Wallet Service!")
}

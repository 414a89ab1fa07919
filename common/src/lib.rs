mod db;
mod error;
mod ledger;
mod schema;

pub use db::*;
pub use error::*;
pub use ledger::*;
pub use schema::*;

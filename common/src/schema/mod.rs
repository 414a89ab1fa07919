mod transaction;
mod users;
mod wallet;

pub use transaction::*;
pub use users::*;
pub use wallet::*;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ticket Wallet CLI - manage admin and user accounts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a superuser (admin) account
    ///
    /// Admins can approve and reject deposits and withdrawals.
    CreateSuperuser(AccountArgs),

    /// Create a regular user account
    CreateUser(AccountArgs),
}

#[derive(ClapArgs, Debug)]
pub struct AccountArgs {
    /// Username for the account
    #[arg(short, long, help = "Username for the account")]
    pub username: String,

    /// Email address for the account
    #[arg(short, long, help = "Email address for the account")]
    pub email: String,

    /// Password for the account
    #[arg(short, long, help = "Password for the account")]
    pub password: String,
}

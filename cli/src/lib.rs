mod args;

pub use args::{AccountArgs, Args, Commands};
use clap::Parser;
use common::{Database, User, UserRole};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::CreateSuperuser(account)) => {
            if let Err(e) = create_account(account, UserRole::Admin).await {
                eprintln!("Failed to create superuser: {e}");
            }
            true
        }
        Some(Commands::CreateUser(account)) => {
            if let Err(e) = create_account(account, UserRole::User).await {
                eprintln!("Failed to create user: {e}");
            }
            true
        }
        None => {
            println!("No CLI command provided. Use --help to see available commands.");
            false
        }
    }
}

/// Validates input, hashes the password, checks for duplicates, and saves to DB.
async fn create_account(account: &AccountArgs, role: UserRole) -> anyhow::Result<()> {
    let user = User::new(&account.username, &account.email, &account.password, role)
        .map_err(|e| anyhow::anyhow!("Validation error: {e}"))?;

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    let db = Database::new(&database_url, std::time::Duration::from_secs(5)).await?;

    let existing = db
        .get_user(&account.username)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to look up user {}: {e}", account.username))?;
    if existing.is_some() {
        return Err(anyhow::anyhow!(
            "A user with username '{}' already exists.",
            account.username
        ));
    }

    let saved = db
        .save_user(&user)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    println!(
        "{:?} '{}' created successfully with id {}.",
        saved.role, saved.username, saved.id
    );
    Ok(())
}

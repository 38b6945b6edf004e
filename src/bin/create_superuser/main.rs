//! Creates an administrator account from the command line.
//!
//! Usage: create_superuser <username> <email> <first_name> <phone_number> [password]
//!
//! Without a password argument the account gets an unusable password and
//! must have one set before it can log in.

use anyhow::{bail, Context, Result};
use env_logger::Env;
use ticketdesk::accounts::{create_superuser, NewUser};
use ticketdesk::db::{get_db_pool, init_db};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    ticketdesk::session::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 || args.len() > 5 {
        bail!("usage: create_superuser <username> <email> <first_name> <phone_number> [password]");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    init_db(database_url)
        .await
        .context("failed to connect to the database")?;

    let new_user = NewUser::new(
        &args[2],
        &args[1],
        &args[0],
        &args[3],
        args.get(4).map(String::as_str),
    );
    let user = create_superuser(get_db_pool(), &new_user)
        .await
        .context("failed to create superuser")?;

    println!("Superuser {} created (id {})", user.username, user.id);
    Ok(())
}

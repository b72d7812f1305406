use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password;
use crate::config::{AdminSeed, DatabaseConfig};
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role};

pub type DbPool = PgPool;

pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the seed administrator unless an account with that username exists.
pub async fn seed_admin(pool: &DbPool, seed: &AdminSeed) -> Result<(), AppError> {
    if user::find_by_username(pool, &seed.username).await?.is_some() {
        return Ok(());
    }
    let password_hash = password::hash_password(&seed.password)?;
    let admin = NewUser {
        username: seed.username.clone(),
        email: format!("{}@localhost", seed.username),
        password_hash,
        first_name: "System".to_string(),
        surname: "Administrator".to_string(),
        position: None,
        role: Role::SuperAdmin,
    };
    let id = user::create(pool, &admin).await?;
    log::info!("Seeded administrator account '{}' (id={id})", seed.username);
    Ok(())
}

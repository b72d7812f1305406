use sqlx::{PgPool, Postgres, QueryBuilder};

use super::types::{NewUser, ProfileUpdate, User};

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// True when either the username or the email is already taken.
pub async fn exists(pool: &PgPool, username: &str, email: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR LOWER(email) = LOWER($2))",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn create(pool: &PgPool, user: &NewUser) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash, first_name, surname, position, role) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.surname)
    .bind(&user.position)
    .bind(user.role.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Apply the fields present in `update`. `password_hash` replaces the stored
/// hash when the caller changed the password. Returns the updated row.
pub async fn update_profile(
    pool: &PgPool,
    id: i64,
    update: &ProfileUpdate,
    password_hash: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
    let text = [
        ("email", update.email.as_deref()),
        ("first_name", update.first_name.as_deref()),
        ("surname", update.surname.as_deref()),
        ("position", update.position.as_deref()),
        ("password_hash", password_hash),
    ];
    for (column, value) in text {
        if let Some(value) = value {
            qb.push(format!(", {column} = ")).push_bind(value.trim().to_string());
        }
    }
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    qb.build_query_as::<User>().fetch_optional(pool).await
}

/// Returns false when no such user exists.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

use crate::accounts::models::{NewUserAccount, UserAccount};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::info;

pub type DbPool = Pool<Sqlite>;

/// Database operations for user accounts
pub struct UserRepo;

impl UserRepo {
    /// All rows whose username matches exactly (case-sensitive).
    pub async fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Vec<UserAccount>> {
        let users = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    /// Look up the owner of an API key
    pub async fn find_by_api_key(pool: &DbPool, api_key: &str) -> AppResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE api_key = ?")
            .bind(api_key)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Insert a new account.
    ///
    /// Uniqueness is enforced by the `username` index, so two concurrent
    /// inserts for the same name cannot both succeed.
    pub async fn insert(pool: &DbPool, new_user: NewUserAccount) -> AppResult<UserAccount> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, api_key, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_user.id)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.api_key)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::UserExists)
            }
            Err(e) => return Err(e.into()),
        }

        Ok(UserAccount {
            id: new_user.id,
            username: new_user.username,
            password_hash: new_user.password_hash,
            api_key: new_user.api_key,
            created_at: now,
        })
    }

    /// Delete by internal id. Returns the number of rows removed.
    pub async fn delete_by_id(pool: &DbPool, id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count accounts
    pub async fn count(pool: &DbPool) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
pub async fn setup_test_db() -> DbPool {
    use sqlx::sqlite::SqlitePoolOptions;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_db(&pool).await.expect("Failed to init database");
    pool
}

/// Initialize database with migrations
pub async fn init_db(pool: &DbPool) -> AppResult<()> {
    info!("Running database migrations");

    // Default BINARY collation: usernames are compared case-sensitively.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            api_key TEXT UNIQUE NOT NULL,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_api_key ON users(api_key)")
        .execute(pool)
        .await?;

    info!("Database migrations complete");
    Ok(())
}

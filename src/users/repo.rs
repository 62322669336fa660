use anyhow::Context;
use sqlx::{PgExecutor, PgPool};

use super::repo_types::{User, UserChanges, UserId};

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, image_filename";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: UserId) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> anyhow::Result<UserId> {
        let (id,) = sqlx::query_as::<_, (UserId,)>(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(id)
    }

    pub async fn update(db: &PgPool, id: UserId, changes: &UserChanges) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET email         = COALESCE($2, email),
                   first_name    = COALESCE($3, first_name),
                   last_name     = COALESCE($4, last_name),
                   password_hash = COALESCE($5, password_hash)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.password_hash.as_deref())
        .execute(db)
        .await
        .context("update user")?;
        Ok(())
    }
}

/// Store (login) or clear (logout) the user's current credential.
pub async fn set_auth_token(db: &PgPool, id: UserId, token: Option<&str>) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET auth_token = $2 WHERE id = $1")
        .bind(id)
        .bind(token)
        .execute(db)
        .await
        .context("set auth token")?;
    Ok(())
}

pub async fn credential_is_current(db: &PgPool, id: UserId, token: &str) -> anyhow::Result<bool> {
    let (current,) = sqlx::query_as::<_, (bool,)>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND auth_token = $2)",
    )
    .bind(id)
    .bind(token)
    .fetch_one(db)
    .await
    .context("check current credential")?;
    Ok(current)
}

pub async fn set_image_filename(
    db: &PgPool,
    id: UserId,
    filename: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET image_filename = $2 WHERE id = $1")
        .bind(id)
        .bind(filename)
        .execute(db)
        .await
        .context("set user image filename")?;
    Ok(())
}

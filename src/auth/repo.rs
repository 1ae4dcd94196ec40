use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Permanent account. Created only by promoting a verified `TempUser`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Pending signup awaiting email verification. At most one per email; a
/// newer signup for the same address supersedes it.
#[derive(Debug, Clone, FromRow)]
pub struct TempUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub otp_hash: String,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

impl TempUser {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<TempUser>> {
        let temp_user = sqlx::query_as::<_, TempUser>(
            r#"
            SELECT id, name, email, password_hash, otp_hash, created_at
            FROM temp_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(temp_user)
    }

    pub async fn delete_by_email(db: &PgPool, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM temp_users WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        otp_hash: &str,
    ) -> anyhow::Result<TempUser> {
        let temp_user = sqlx::query_as::<_, TempUser>(
            r#"
            INSERT INTO temp_users (name, email, password_hash, otp_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, otp_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(otp_hash)
        .fetch_one(db)
        .await?;
        Ok(temp_user)
    }

    /// Turns a verified pending signup into a permanent account.
    /// Both writes commit or neither: no orphaned TempUser, no duplicate User.
    pub async fn promote(self, db: &PgPool) -> anyhow::Result<User> {
        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM temp_users WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }
}

/// The storage layer's unique constraints are the last word on duplicate
/// signups; callers map a violated constraint to an "already exists"
/// rejection instead of a server error.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_never_exposes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).expect("serialize user");
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn non_sqlx_errors_are_not_unique_violations() {
        let err = anyhow::anyhow!("something else entirely");
        assert!(!is_unique_violation(&err));
    }
}

use std::fmt;

use async_trait::async_trait;
use sqlx::{error::ErrorKind, FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::model::User;
use crate::auth::password::{hash_password, PasswordError};

/// Upper bound on rows returned by a listing.
pub const LIST_LIMIT: i64 = 100;

/// Column guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Address,
    Email,
}

impl UniqueField {
    /// Maps a violated constraint name from the schema to its column.
    pub fn from_constraint(name: &str) -> Option<Self> {
        match name {
            "users_address_key" => Some(UniqueField::Address),
            "users_email_key" => Some(UniqueField::Email),
            _ => None,
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Address => f.write_str("Address"),
            UniqueField::Email => f.write_str("Email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} already taken")]
    Conflict(UniqueField),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Storage(sqlx::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db_err) => {
                let field = match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        db_err.constraint().and_then(UniqueField::from_constraint)
                    }
                    _ => None,
                };
                match field {
                    Some(field) => RepoError::Conflict(field),
                    None => RepoError::Storage(sqlx::Error::Database(db_err)),
                }
            }
            other => RepoError::Storage(other),
        }
    }
}

/// All reads and writes of user rows go through this.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Hashes the password and inserts the user.
    async fn create(&self, user: &User) -> Result<User, RepoError>;
    async fn find_all(&self, limit: i64) -> Result<Vec<User>, RepoError>;
    async fn find_by_id(&self, id: u64) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<User, RepoError>;
    /// Re-hashes the password and overwrites address, email, password and
    /// updated_at. Id and created_at never change.
    async fn update(&self, id: u64, user: &User) -> Result<User, RepoError>;
    /// Returns rows affected; zero is not an error.
    async fn delete(&self, id: u64) -> Result<u64, RepoError>;
}

/// User row as stored.
#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    address: String,
    email: String,
    password: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            // BIGSERIAL keys are always positive
            id: r.user_id as u64,
            address: r.address,
            email: r.email,
            password: r.password,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Ids beyond the signed key range cannot be stored.
fn db_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepoError> {
        let hash = hash_password(&user.password)?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (address, email, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, address, email, password, created_at, updated_at
            "#,
        )
        .bind(&user.address)
        .bind(&user.email)
        .bind(&hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await?;
        debug!(user_id = row.user_id, "user inserted");
        Ok(row.into())
    }

    async fn find_all(&self, limit: i64) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, address, email, password, created_at, updated_at
            FROM users
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(0, LIST_LIMIT))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<User, RepoError> {
        let id = db_id(id).ok_or(RepoError::NotFound)?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, address, email, password, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, address, email, password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn update(&self, id: u64, user: &User) -> Result<User, RepoError> {
        let id = db_id(id).ok_or(RepoError::NotFound)?;
        let hash = hash_password(&user.password)?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET password = $2, address = $3, email = $4, updated_at = $5
            WHERE user_id = $1
            RETURNING user_id, address, email, password, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&hash)
        .bind(&user.address)
        .bind(&user.email)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)?;
        debug!(user_id = row.user_id, "user updated");
        Ok(row.into())
    }

    async fn delete(&self, id: u64) -> Result<u64, RepoError> {
        let Some(id) = db_id(id) else {
            return Ok(0);
        };
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        debug!(user_id = id, rows = result.rows_affected(), "user deleted");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::users::model::UserPayload;

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(
            UniqueField::from_constraint("users_address_key"),
            Some(UniqueField::Address)
        );
        assert_eq!(
            UniqueField::from_constraint("users_email_key"),
            Some(UniqueField::Email)
        );
        assert_eq!(UniqueField::from_constraint("users_pkey"), None);
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            RepoError::from(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
        assert!(matches!(
            RepoError::from(sqlx::Error::PoolTimedOut),
            RepoError::Storage(_)
        ));
    }

    #[test]
    fn oversized_ids_have_no_row() {
        assert_eq!(db_id(5), Some(5));
        assert_eq!(db_id(u64::MAX), None);
    }

    #[test]
    fn field_display_feeds_conflict_message() {
        assert_eq!(UniqueField::Address.to_string(), "Address");
        assert_eq!(UniqueField::Email.to_string(), "Email");
    }

    fn draft(address: &str, email: &str, password: &str) -> User {
        let mut user = User::from(UserPayload {
            address: address.into(),
            email: email.into(),
            password: password.into(),
        });
        user.normalize();
        user
    }

    #[sqlx::test]
    async fn create_hashes_and_assigns_id(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let user = repo
            .create(&draft("Jl.Manggis No.29", "koga@gmail.com", "password"))
            .await
            .unwrap();

        assert!(user.id > 0);
        assert_eq!(user.address, "Jl.Manggis No.29");
        assert_ne!(user.password, "password");
        verify_password(&user.password, "password").unwrap();
    }

    #[sqlx::test]
    async fn duplicate_address_is_address_conflict(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create(&draft("Jl.sukma jaya", "sukma@gmail.com", "password"))
            .await
            .unwrap();

        let err = repo
            .create(&draft("Jl.sukma jaya", "grand@gmail.com", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(UniqueField::Address)));
    }

    #[sqlx::test]
    async fn duplicate_email_is_email_conflict(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create(&draft("Jl.sukma jaya", "sukma@gmail.com", "password"))
            .await
            .unwrap();

        let err = repo
            .create(&draft("Jl.Frangius", "sukma@gmail.com", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(UniqueField::Email)));
    }

    #[sqlx::test]
    async fn update_keeps_id_and_created_at(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let original = repo
            .create(&draft("Jl.Manggis No.29", "koga@gmail.com", "password"))
            .await
            .unwrap();

        let updated = repo
            .update(original.id, &draft("Jl.Melati", "melati@gmail.com", "new-password"))
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at >= original.updated_at);
        assert_eq!(updated.address, "Jl.Melati");
        assert_eq!(updated.email, "melati@gmail.com");
        verify_password(&updated.password, "new-password").unwrap();

        let reread = repo.find_by_id(original.id).await.unwrap();
        assert_eq!(reread.email, "melati@gmail.com");
    }

    #[sqlx::test]
    async fn update_into_taken_email_conflicts(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let owner = repo
            .create(&draft("Jl.Manggis No.29", "koga@gmail.com", "password"))
            .await
            .unwrap();
        repo.create(&draft("Jl.Apel No.99", "testing@gmail.com", "password"))
            .await
            .unwrap();

        let err = repo
            .update(owner.id, &draft("Jl.Melati", "testing@gmail.com", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(UniqueField::Email)));
    }

    #[sqlx::test]
    async fn missing_rows_are_not_found(pool: PgPool) {
        let repo = PgUserRepository::new(pool);

        assert!(matches!(repo.find_by_id(12322).await, Err(RepoError::NotFound)));
        assert!(matches!(
            repo.find_by_email("nobody@gmail.com").await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repo.update(12322, &draft("Jl.Melati", "melati@gmail.com", "password"))
                .await,
            Err(RepoError::NotFound)
        ));
    }

    #[sqlx::test]
    async fn find_all_returns_every_row(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create(&draft("Jl.Manggis No.29", "koga@gmail.com", "password"))
            .await
            .unwrap();
        repo.create(&draft("Jl.Apel No.99", "testing@gmail.com", "password"))
            .await
            .unwrap();

        assert_eq!(repo.find_all(LIST_LIMIT).await.unwrap().len(), 2);
        assert_eq!(repo.find_all(1).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    async fn delete_reports_rows_affected(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let user = repo
            .create(&draft("Jl.Manggis No.29", "koga@gmail.com", "password"))
            .await
            .unwrap();

        assert_eq!(repo.delete(user.id).await.unwrap(), 1);
        assert_eq!(repo.delete(user.id).await.unwrap(), 0);
        assert!(matches!(repo.find_by_id(user.id).await, Err(RepoError::NotFound)));
    }
}

//! In-process `UserRepository` used by the handler tests. Enforces the same
//! unique constraints as the `users` table.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    model::User,
    repo::{RepoError, UniqueField, UserRepository, LIST_LIMIT},
};
use crate::auth::password::hash_password;

#[derive(Default)]
pub struct MemoryUserRepository {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    rows: Vec<User>,
}

impl Inner {
    fn check_unique(&self, user: &User, except: Option<u64>) -> Result<(), RepoError> {
        for row in self.rows.iter().filter(|r| Some(r.id) != except) {
            if row.address == user.address {
                return Err(RepoError::Conflict(UniqueField::Address));
            }
            if row.email == user.email {
                return Err(RepoError::Conflict(UniqueField::Email));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepoError> {
        let hash = hash_password(&user.password)?;
        let mut inner = self.inner.lock().unwrap();
        inner.check_unique(user, None)?;
        inner.next_id += 1;
        let stored = User {
            id: inner.next_id,
            password: hash,
            ..user.clone()
        };
        inner.rows.push(stored.clone());
        Ok(stored)
    }

    async fn find_all(&self, limit: i64) -> Result<Vec<User>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let take = limit.clamp(0, LIST_LIMIT) as usize;
        Ok(inner.rows.iter().take(take).cloned().collect())
    }

    async fn find_by_id(&self, id: u64) -> Result<User, RepoError> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepoError> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .iter()
            .find(|r| r.email == email)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, id: u64, user: &User) -> Result<User, RepoError> {
        let hash = hash_password(&user.password)?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.rows.iter().any(|r| r.id == id) {
            return Err(RepoError::NotFound);
        }
        inner.check_unique(user, Some(id))?;
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.password = hash;
        row.address = user.address.clone();
        row.email = user.email.clone();
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete(&self, id: u64) -> Result<u64, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id != id);
        Ok((before - inner.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::model::UserPayload;

    fn draft(address: &str, email: &str) -> User {
        let mut user = User::from(UserPayload {
            address: address.into(),
            email: email.into(),
            password: "password".into(),
        });
        user.normalize();
        user
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found_before_conflict() {
        let repo = MemoryUserRepository::default();
        repo.create(&draft("Jl.Apel No.99", "testing@gmail.com"))
            .await
            .unwrap();

        let err = repo
            .update(12322, &draft("Jl.Melati", "testing@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }
}

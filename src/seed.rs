use tracing::{info, warn};

use crate::users::{
    model::{User, UserPayload},
    repo::{RepoError, UserRepository},
    validate::Action,
};

const SAMPLE_USERS: &[(&str, &str)] = &[
    ("Jl.Manggis No.29", "koga@gmail.com"),
    ("Jl.Apel No.99", "testing@gmail.com"),
];

const SAMPLE_PASSWORD: &str = "password";

/// Inserts the sample users, skipping any that already exist. Returns how
/// many were created.
pub async fn load(users: &dyn UserRepository) -> anyhow::Result<usize> {
    let mut created = 0;
    for (address, email) in SAMPLE_USERS {
        let mut user = User::from(UserPayload {
            address: (*address).into(),
            email: (*email).into(),
            password: SAMPLE_PASSWORD.into(),
        });
        user.normalize();
        user.validate(Action::Create)?;

        match users.create(&user).await {
            Ok(u) => {
                info!(user_id = u.id, email = %u.email, "sample user seeded");
                created += 1;
            }
            Err(RepoError::Conflict(field)) => {
                warn!(%field, email = %user.email, "sample user already present");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

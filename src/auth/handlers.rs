use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::password::verify_password,
    error::ApiError,
    state::AppState,
    users::{
        handlers::parse_body,
        model::{User, UserPayload},
        repo::RepoError,
        validate::Action,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Responds with the signed token as a JSON string.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let mut credentials = User::from(parse_body(payload)?);
    credentials.normalize();
    credentials.validate(Action::Login)?;

    let user = match state.users.find_by_email(&credentials.email).await {
        Ok(u) => u,
        Err(RepoError::NotFound) => {
            warn!(email = %credentials.email, "login unknown email");
            return Err(ApiError::UnknownAccount);
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = verify_password(&user.password, &credentials.password) {
        warn!(user_id = user.id, "login invalid password");
        return Err(e.into());
    }

    let token = state.keys.sign(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(token))
}

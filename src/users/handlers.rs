use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::LOCATION, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    model::{User, UserPayload},
    repo::LIST_LIMIT,
    validate::Action,
};
use crate::{
    auth::extractors::{authorize, BearerToken},
    error::ApiError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user)
                .post(update_user)
                .put(update_user)
                .delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<User>), ApiError> {
    let mut user = User::from(parse_body(payload)?);
    user.normalize();
    user.validate(Action::Create)?;

    let created = state.users.create(&user).await?;

    info!(user_id = created.id, "user created");
    let location = format!("/users/{}", created.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(created)))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.find_all(LIST_LIMIT).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = state.users.find_by_id(id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, token, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BearerToken(token): BearerToken,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&id)?;
    authorize(&state.keys, token.as_deref(), id)?;

    let mut user = User::from(parse_body(payload)?);
    user.normalize();
    user.id = id;
    user.validate(Action::Update)?;

    let updated = state.users.update(id, &user).await?;

    info!(user_id = updated.id, "user updated");
    Ok(Json(updated))
}

#[instrument(skip(state, token))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError> {
    let id = parse_user_id(&id)?;
    authorize(&state.keys, token.as_deref(), id)?;

    let rows = state.users.delete(id).await?;

    info!(user_id = id, rows, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn parse_user_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::BadRequest(raw.to_string()))
}

pub(crate) fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))
}

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    accounts::{
        dto::{PublicUser, RefreshRequest, RegisterRequest, TokenRequest, TokenResponse, UpdateMeRequest},
        jwt::{AuthUser, JwtKeys},
        repo_types::User,
        services::{self, NewAccount, ProfileChanges},
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/token", post(create_token))
        .route("/users/token/refresh", post(refresh_token))
        .route("/users/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let new = NewAccount {
        email: payload.email,
        password: payload.password,
        name: payload.name,
    };
    let user = services::create_account(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = services::normalize_email(&payload.email);
    if !services::is_valid_email(&email) || payload.password.is_empty() {
        return Err(AppError::validation(
            "Unable to authenticate with provided credentials",
        ));
    }

    let user = services::authenticate(&state.db, &email, &payload.password)
        .await?
        .ok_or_else(|| AppError::validation("Unable to authenticate with provided credentials"))?;

    let pair = JwtKeys::from_ref(&state).issue_pair(user.id).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        AppError::Internal(e)
    })?;

    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let pair = keys.issue_pair(user.id)?;
    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.into(),
    }))
}

async fn load_caller(state: &AppState, user_id: uuid::Uuid) -> AppResult<User> {
    User::find_by_id(&state.db, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            error!(user_id = %user_id, "token subject not found");
            AppError::Unauthorized("User not found".into())
        })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = load_caller(&state, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateMeRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = load_caller(&state, user_id).await?;
    let changes = ProfileChanges {
        email: payload.email,
        name: payload.name,
        password: payload.password,
    };
    let updated = services::update_profile(&state.db, &user, changes).await?;
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".into(),
            name: "Test".into(),
            password_hash: "$argon2id$secret".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}

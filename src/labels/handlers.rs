use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{LabelListQuery, LabelRequest, LabelResponse};
use super::repo_types::{Ingredients, LabelTable, Tags};
use super::services;
use crate::{
    accounts::AuthUser,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

fn label_routes<T: LabelTable>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list_labels::<T>).post(create_label::<T>))
        .route(
            &format!("{base}/:id"),
            patch(update_label::<T>)
                .put(update_label::<T>)
                .delete(delete_label::<T>),
        )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(label_routes::<Tags>("/tags"))
        .merge(label_routes::<Ingredients>("/ingredients"))
}

#[instrument(skip(state), fields(kind = T::KIND.noun()))]
pub async fn list_labels<T: LabelTable>(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(q): AppQuery<LabelListQuery>,
) -> AppResult<Json<Vec<LabelResponse>>> {
    let assigned_only = services::parse_assigned_only(q.assigned_only.as_deref())?;
    let labels = services::list(&state.db, T::KIND, user_id, assigned_only).await?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

#[instrument(skip(state, body), fields(kind = T::KIND.noun()))]
pub async fn create_label<T: LabelTable>(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<LabelRequest>,
) -> AppResult<(StatusCode, Json<LabelResponse>)> {
    let (label, created) = services::create(&state.db, T::KIND, user_id, &body.name).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(label.into())))
}

#[instrument(skip(state, body), fields(kind = T::KIND.noun()))]
pub async fn update_label<T: LabelTable>(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<LabelRequest>,
) -> AppResult<Json<LabelResponse>> {
    let label = services::update(&state.db, T::KIND, user_id, id, &body.name).await?;
    Ok(Json(label.into()))
}

#[instrument(skip(state), fields(kind = T::KIND.noun()))]
pub async fn delete_label<T: LabelTable>(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state.db, T::KIND, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

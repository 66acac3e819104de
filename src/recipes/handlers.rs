use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::dto::{RecipeDetail, RecipeImageResponse, RecipeRequest, RecipeSummary};
use super::filters::{RecipeFilter, RecipeListQuery};
use super::repo_types::RecipeView;
use super::services::{self, WriteMode};
use crate::{
    accounts::AuthUser,
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route(
            "/recipes/:id",
            axum::routing::put(replace_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipes/:id/image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

async fn image_url(state: &AppState, key: Option<&str>) -> Option<String> {
    let key = key?;
    match state
        .storage
        .presign_get(key, state.config.storage.url_ttl_secs)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            error!(error = %e, key, "presign failed");
            None
        }
    }
}

async fn detail(state: &AppState, view: RecipeView) -> RecipeDetail {
    let url = image_url(state, view.recipe.image.as_deref()).await;
    RecipeDetail::new(view, url)
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(q): AppQuery<RecipeListQuery>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    let filter = RecipeFilter::try_from(q)?;
    let views = services::list(&state.db, user_id, &filter).await?;
    Ok(Json(views.into_iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<RecipeDetail>> {
    let view = services::get(&state.db, user_id, id).await?;
    Ok(Json(detail(&state, view).await))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<RecipeRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<RecipeDetail>)> {
    let view = services::create(&state.db, user_id, body.into()).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/recipes/{}", view.recipe.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(detail(&state, view).await)))
}

async fn update_with(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    body: RecipeRequest,
    mode: WriteMode,
) -> AppResult<Json<RecipeDetail>> {
    let view = services::update(&state.db, user_id, id, body.into(), mode).await?;
    Ok(Json(detail(&state, view).await))
}

#[instrument(skip(state, body))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<RecipeRequest>,
) -> AppResult<Json<RecipeDetail>> {
    update_with(state, user_id, id, body, WriteMode::Replace).await
}

#[instrument(skip(state, body))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<RecipeRequest>,
) -> AppResult<Json<RecipeDetail>> {
    update_with(state, user_id, id, body, WriteMode::Patch).await
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/:id/image (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<RecipeImageResponse>> {
    let mut mp = mp?;
    let mut data = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
            data = Some(bytes);
            break;
        }
    }

    let Some(data) = data else {
        warn!(recipe_id = %id, "upload without image field");
        return Err(AppError::validation("No file was submitted in field 'image'"));
    };

    let recipe = services::set_image(&state, user_id, id, data).await?;
    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: image_url(&state, recipe.image.as_deref()).await,
    }))
}

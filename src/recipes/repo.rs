use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::filters::RecipeFilter;
use super::repo_types::{ImageSwap, Recipe, RecipeFields};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image, created_at";

/// Inserts a recipe; every column in `fields` must be set.
pub async fn insert(
    conn: &mut PgConnection,
    owner: Uuid,
    fields: &RecipeFields,
) -> sqlx::Result<Recipe> {
    sqlx::query_as::<_, Recipe>(&format!(
        r#"
        INSERT INTO recipes (id, user_id, title, description, time_minutes, price, link)
        VALUES ($1, $2, $3, COALESCE($4, ''), $5, $6, COALESCE($7, ''))
        RETURNING {RECIPE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_one(conn)
    .await
}

/// Owner-scoped update; `None` when the recipe is absent or not the owner's.
pub async fn update_fields(
    conn: &mut PgConnection,
    owner: Uuid,
    id: Uuid,
    fields: &RecipeFields,
) -> sqlx::Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(&format!(
        r#"
        UPDATE recipes
           SET title = COALESCE($3, title),
               description = COALESCE($4, description),
               time_minutes = COALESCE($5, time_minutes),
               price = COALESCE($6, price),
               link = COALESCE($7, link)
         WHERE id = $1 AND user_id = $2
        RETURNING {RECIPE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_optional(conn)
    .await
}

pub async fn find_owned(db: &PgPool, owner: Uuid, id: Uuid) -> sqlx::Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await
}

/// Newest first. Each filter side matches recipes linked to any of its ids.
pub async fn list(db: &PgPool, owner: Uuid, filter: &RecipeFilter) -> sqlx::Result<Vec<Recipe>> {
    sqlx::query_as::<_, Recipe>(&format!(
        r#"
        SELECT {RECIPE_COLUMNS}
          FROM recipes r
         WHERE r.user_id = $1
           AND ($2::uuid[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                 WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
           AND ($3::uuid[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri
                 WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
         ORDER BY r.created_at DESC, r.id DESC
        "#
    ))
    .bind(owner)
    .bind(filter.tag_ids.clone())
    .bind(filter.ingredient_ids.clone())
    .fetch_all(db)
    .await
}

/// Points the recipe at a new image key. `None` if the recipe vanished meanwhile.
/// Points an owned recipe at a new image key and returns the key it replaced.
/// The row lock makes concurrent swaps see each other's keys.
pub async fn set_image(
    db: &PgPool,
    owner: Uuid,
    id: Uuid,
    key: &str,
) -> sqlx::Result<Option<ImageSwap>> {
    sqlx::query_as::<_, ImageSwap>(
        r#"
        UPDATE recipes r SET image = $3
          FROM (SELECT id, image AS old_image
                  FROM recipes
                 WHERE id = $1 AND user_id = $2
                   FOR UPDATE) prev
         WHERE r.id = prev.id
        RETURNING r.id, r.user_id, r.title, r.description, r.time_minutes,
                  r.price, r.link, r.image, r.created_at, prev.old_image
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(key)
    .fetch_optional(db)
    .await
}

/// Deletes an owned recipe and returns it; links cascade.
pub async fn delete(db: &PgPool, owner: Uuid, id: Uuid) -> sqlx::Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(&format!(
        "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await
}

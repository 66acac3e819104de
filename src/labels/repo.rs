use std::collections::HashMap;

use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{Label, LabelKind};
use crate::error::{AppError, AppResult};

const LABEL_COLUMNS: &str = "id, user_id, name, created_at";

/// Owner's entries ordered by name descending; optionally only those used by a recipe.
pub async fn list(
    db: &PgPool,
    kind: LabelKind,
    owner: Uuid,
    assigned_only: bool,
) -> sqlx::Result<Vec<Label>> {
    sqlx::query_as::<_, Label>(&format!(
        r#"
        SELECT l.id, l.user_id, l.name, l.created_at
          FROM {table} l
         WHERE l.user_id = $1
           AND (NOT $2 OR EXISTS (SELECT 1 FROM {join} j WHERE j.{col} = l.id))
         ORDER BY l.name DESC, l.id
        "#,
        table = kind.table(),
        join = kind.join_table(),
        col = kind.join_column(),
    ))
    .bind(owner)
    .bind(assigned_only)
    .fetch_all(db)
    .await
}

/// Returns the owner's entry with this name, inserting it when absent.
/// The flag is true when a row was created.
pub async fn get_or_create(
    conn: &mut PgConnection,
    kind: LabelKind,
    owner: Uuid,
    name: &str,
) -> sqlx::Result<(Label, bool)> {
    let inserted = sqlx::query_as::<_, Label>(&format!(
        r#"
        INSERT INTO {table} (id, user_id, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, name) DO NOTHING
        RETURNING {LABEL_COLUMNS}
        "#,
        table = kind.table(),
    ))
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(label) = inserted {
        return Ok((label, true));
    }

    let existing = sqlx::query_as::<_, Label>(&format!(
        "SELECT {LABEL_COLUMNS} FROM {table} WHERE user_id = $1 AND name = $2",
        table = kind.table(),
    ))
    .bind(owner)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok((existing, false))
}

/// Get-or-create every name; duplicates in `names` resolve once.
pub async fn resolve_names(
    conn: &mut PgConnection,
    kind: LabelKind,
    owner: Uuid,
    names: &[String],
) -> sqlx::Result<Vec<Label>> {
    let mut out: Vec<Label> = Vec::with_capacity(names.len());
    for name in names {
        if out.iter().any(|l| &l.name == name) {
            continue;
        }
        let (label, _) = get_or_create(&mut *conn, kind, owner, name).await?;
        out.push(label);
    }
    Ok(out)
}

/// Replaces the recipe's links of this kind with exactly `label_ids`.
pub async fn replace_links(
    conn: &mut PgConnection,
    kind: LabelKind,
    recipe_id: Uuid,
    label_ids: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {join} WHERE recipe_id = $1",
        join = kind.join_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    if label_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(&format!(
        r#"
        INSERT INTO {join} (recipe_id, {col})
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
        join = kind.join_table(),
        col = kind.join_column(),
    ))
    .bind(recipe_id)
    .bind(label_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(FromRow)]
struct LinkedLabel {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    label: Label,
}

/// Labels of this kind attached to each recipe, sorted by name.
pub async fn for_recipes(
    db: &PgPool,
    kind: LabelKind,
    recipe_ids: &[Uuid],
) -> sqlx::Result<HashMap<Uuid, Vec<Label>>> {
    let mut by_recipe: HashMap<Uuid, Vec<Label>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    let rows = sqlx::query_as::<_, LinkedLabel>(&format!(
        r#"
        SELECT j.recipe_id, l.id, l.user_id, l.name, l.created_at
          FROM {join} j
          JOIN {table} l ON l.id = j.{col}
         WHERE j.recipe_id = ANY($1)
         ORDER BY l.name, l.id
        "#,
        join = kind.join_table(),
        table = kind.table(),
        col = kind.join_column(),
    ))
    .bind(recipe_ids)
    .fetch_all(db)
    .await?;

    for row in rows {
        by_recipe.entry(row.recipe_id).or_default().push(row.label);
    }
    Ok(by_recipe)
}

pub async fn rename(
    db: &PgPool,
    kind: LabelKind,
    owner: Uuid,
    id: Uuid,
    name: &str,
) -> AppResult<Label> {
    sqlx::query_as::<_, Label>(&format!(
        r#"
        UPDATE {table}
           SET name = $3
         WHERE id = $1 AND user_id = $2
        RETURNING {LABEL_COLUMNS}
        "#,
        table = kind.table(),
    ))
    .bind(id)
    .bind(owner)
    .bind(name)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)
}

pub async fn delete(db: &PgPool, kind: LabelKind, owner: Uuid, id: Uuid) -> AppResult<()> {
    let done = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id = $1 AND user_id = $2",
        table = kind.table()
    ))
    .bind(id)
    .bind(owner)
    .execute(db)
    .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

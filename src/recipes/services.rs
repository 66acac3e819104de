use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use super::filters::RecipeFilter;
use super::images::{image_key, inspect_image};
use super::repo;
use super::repo_types::{Recipe, RecipeFields, RecipeView};
use crate::error::{AppError, AppResult};
use crate::labels::{self, repo_types::clean_name, LabelKind};
use crate::state::AppState;
use bytes::Bytes;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LINK_LEN: usize = 255;

/// Largest value a NUMERIC(5, 2) column holds.
fn max_price() -> Decimal {
    Decimal::new(99_999, 2)
}

/// How a write treats columns the payload leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New recipe: title, time and price are required.
    Create,
    /// Full update: same requirements, omitted text fields are cleared.
    Replace,
    /// Partial update: only supplied fields change.
    Patch,
}

/// Payload for create/update after deserialisation. `None` label lists leave links untouched.
#[derive(Debug, Clone, Default)]
pub struct RecipeWrite {
    pub fields: RecipeFields,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

fn clean_names(raw: Option<Vec<String>>) -> AppResult<Option<Vec<String>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for r in raw {
        let name = clean_name(&r)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(Some(names))
}

/// Checks every supplied value and applies the mode's defaults.
pub fn validate(write: RecipeWrite, mode: WriteMode) -> AppResult<RecipeWrite> {
    let RecipeWrite {
        mut fields,
        tags,
        ingredients,
    } = write;

    if let Some(title) = fields.title.as_mut() {
        *title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title may not be blank"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "title may not exceed {MAX_TITLE_LEN} characters"
            )));
        }
    }
    if let Some(link) = fields.link.as_mut() {
        *link = link.trim().to_string();
        if link.chars().count() > MAX_LINK_LEN {
            return Err(AppError::validation(format!(
                "link may not exceed {MAX_LINK_LEN} characters"
            )));
        }
    }
    if let Some(minutes) = fields.time_minutes {
        if minutes < 0 {
            return Err(AppError::validation("time_minutes may not be negative"));
        }
    }
    if let Some(price) = fields.price {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(AppError::validation("price may not be negative"));
        }
        if price.normalize().scale() > 2 {
            return Err(AppError::validation(
                "price may have at most 2 decimal places",
            ));
        }
        if price > max_price() {
            return Err(AppError::validation("price may not exceed 999.99"));
        }
    }

    if mode != WriteMode::Patch {
        let missing: Vec<&str> = [
            ("title", fields.title.is_none()),
            ("time_minutes", fields.time_minutes.is_none()),
            ("price", fields.price.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
    }
    if mode == WriteMode::Replace {
        fields.description.get_or_insert_with(String::new);
        fields.link.get_or_insert_with(String::new);
    }

    Ok(RecipeWrite {
        fields,
        tags: clean_names(tags)?,
        ingredients: clean_names(ingredients)?,
    })
}

/// Get-or-create each named label for `owner` and make them the recipe's full set.
async fn relink(
    conn: &mut PgConnection,
    kind: LabelKind,
    owner: Uuid,
    recipe_id: Uuid,
    names: &[String],
) -> AppResult<()> {
    let resolved = labels::repo::resolve_names(&mut *conn, kind, owner, names).await?;
    let ids: Vec<Uuid> = resolved.iter().map(|l| l.id).collect();
    labels::repo::replace_links(&mut *conn, kind, recipe_id, &ids).await?;
    Ok(())
}

async fn relink_all(
    conn: &mut PgConnection,
    owner: Uuid,
    recipe_id: Uuid,
    write: &RecipeWrite,
) -> AppResult<()> {
    if let Some(names) = &write.tags {
        relink(&mut *conn, LabelKind::Tag, owner, recipe_id, names).await?;
    }
    if let Some(names) = &write.ingredients {
        relink(&mut *conn, LabelKind::Ingredient, owner, recipe_id, names).await?;
    }
    Ok(())
}

/// Attaches tags and ingredients to each recipe, keeping the input order.
pub async fn load_views(db: &PgPool, recipes: Vec<Recipe>) -> AppResult<Vec<RecipeView>> {
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut tags = labels::repo::for_recipes(db, LabelKind::Tag, &ids).await?;
    let mut ingredients = labels::repo::for_recipes(db, LabelKind::Ingredient, &ids).await?;
    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeView {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

async fn load_view(db: &PgPool, recipe: Recipe) -> AppResult<RecipeView> {
    load_views(db, vec![recipe])
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

pub async fn create(db: &PgPool, owner: Uuid, write: RecipeWrite) -> AppResult<RecipeView> {
    let write = validate(write, WriteMode::Create)?;

    let mut tx = db.begin().await?;
    let recipe = repo::insert(&mut tx, owner, &write.fields).await?;
    relink_all(&mut tx, owner, recipe.id, &write).await?;
    tx.commit().await?;

    info!(recipe_id = %recipe.id, owner = %owner, "recipe created");
    load_view(db, recipe).await
}

pub async fn get(db: &PgPool, owner: Uuid, id: Uuid) -> AppResult<RecipeView> {
    let recipe = repo::find_owned(db, owner, id)
        .await?
        .ok_or(AppError::NotFound)?;
    load_view(db, recipe).await
}

pub async fn list(db: &PgPool, owner: Uuid, filter: &RecipeFilter) -> AppResult<Vec<RecipeView>> {
    let recipes = repo::list(db, owner, filter).await?;
    load_views(db, recipes).await
}

/// Updates an owned recipe. The owner column is never written.
pub async fn update(
    db: &PgPool,
    owner: Uuid,
    id: Uuid,
    write: RecipeWrite,
    mode: WriteMode,
) -> AppResult<RecipeView> {
    let write = validate(write, mode)?;

    let mut tx = db.begin().await?;
    let recipe = repo::update_fields(&mut tx, owner, id, &write.fields)
        .await?
        .ok_or(AppError::NotFound)?;
    relink_all(&mut tx, owner, recipe.id, &write).await?;
    tx.commit().await?;

    info!(recipe_id = %recipe.id, ?mode, "recipe updated");
    load_view(db, recipe).await
}

async fn discard_object(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete image object");
    }
}

pub async fn delete(st: &AppState, owner: Uuid, id: Uuid) -> AppResult<()> {
    let recipe = repo::delete(&st.db, owner, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if let Some(key) = recipe.image.as_deref() {
        discard_object(st, key).await;
    }
    info!(recipe_id = %id, owner = %owner, "recipe deleted");
    Ok(())
}

/// Stores a new image for an owned recipe. The previous image stays in place
/// unless the new one decodes, uploads and is recorded.
pub async fn set_image(st: &AppState, owner: Uuid, id: Uuid, data: Bytes) -> AppResult<Recipe> {
    repo::find_owned(&st.db, owner, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let checked = inspect_image(&data)?;
    let key = image_key(checked.ext);
    st.storage
        .put_object(&key, data, checked.content_type)
        .await?;

    let swap = match repo::set_image(&st.db, owner, id, &key).await {
        Ok(Some(swap)) => swap,
        Ok(None) => {
            discard_object(st, &key).await;
            return Err(AppError::NotFound);
        }
        Err(e) => {
            discard_object(st, &key).await;
            return Err(e.into());
        }
    };

    if let Some(old) = swap.old_image.as_deref().filter(|old| *old != key) {
        discard_object(st, old).await;
    }
    info!(
        recipe_id = %id,
        key = %key,
        width = checked.width,
        height = checked.height,
        "recipe image replaced"
    );
    Ok(swap.recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn full() -> RecipeWrite {
        RecipeWrite {
            fields: RecipeFields {
                title: Some(" Sample recipe ".into()),
                time_minutes: Some(30),
                price: Some(dec("5.99")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn create_requires_core_fields() {
        let err = validate(RecipeWrite::default(), WriteMode::Create).unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("title"));
                assert!(msg.contains("time_minutes"));
                assert!(msg.contains("price"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn patch_accepts_single_field() {
        let write = RecipeWrite {
            fields: RecipeFields {
                title: Some("New recipe title".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let out = validate(write, WriteMode::Patch).unwrap();
        assert_eq!(out.fields.title.as_deref(), Some("New recipe title"));
        assert_eq!(out.fields.link, None);
        assert_eq!(out.tags, None);
    }

    #[test]
    fn replace_clears_omitted_text_fields() {
        let out = validate(full(), WriteMode::Replace).unwrap();
        assert_eq!(out.fields.title.as_deref(), Some("Sample recipe"));
        assert_eq!(out.fields.description.as_deref(), Some(""));
        assert_eq!(out.fields.link.as_deref(), Some(""));
    }

    #[test]
    fn create_leaves_omitted_text_to_defaults() {
        let out = validate(full(), WriteMode::Create).unwrap();
        assert_eq!(out.fields.description, None);
    }

    #[test]
    fn price_must_fit_column() {
        for bad in ["-1.00", "1000.00", "1.234"] {
            let mut w = full();
            w.fields.price = Some(dec(bad));
            assert!(validate(w, WriteMode::Create).is_err(), "{bad} accepted");
        }
        for good in ["0", "999.99", "2.50", "2.500"] {
            let mut w = full();
            w.fields.price = Some(dec(good));
            assert!(validate(w, WriteMode::Create).is_ok(), "{good} rejected");
        }
    }

    #[test]
    fn negative_time_and_long_title_are_rejected() {
        let mut w = full();
        w.fields.time_minutes = Some(-1);
        assert!(validate(w, WriteMode::Create).is_err());

        let mut w = full();
        w.fields.title = Some("t".repeat(MAX_TITLE_LEN + 1));
        assert!(validate(w, WriteMode::Patch).is_err());
    }

    #[test]
    fn label_names_are_trimmed_and_deduplicated() {
        let mut w = full();
        w.tags = Some(vec!["Thai".into(), " Thai ".into(), "Dinner".into()]);
        w.ingredients = Some(vec![]);
        let out = validate(w, WriteMode::Create).unwrap();
        assert_eq!(out.tags, Some(vec!["Thai".to_string(), "Dinner".to_string()]));
        assert_eq!(out.ingredients, Some(vec![]));
    }

    #[test]
    fn blank_label_name_is_rejected() {
        let mut w = full();
        w.ingredients = Some(vec!["  ".into()]);
        assert!(matches!(
            validate(w, WriteMode::Create),
            Err(AppError::Validation(_))
        ));
    }
}

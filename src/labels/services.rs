use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::repo;
use super::repo_types::{clean_name, Label, LabelKind};
use crate::error::{AppError, AppResult};

/// Parses the `assigned_only` query flag.
pub fn parse_assigned_only(raw: Option<&str>) -> AppResult<bool> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(AppError::validation(format!(
            "assigned_only must be 0 or 1, got '{other}'"
        ))),
    }
}

pub async fn list(
    db: &PgPool,
    kind: LabelKind,
    owner: Uuid,
    assigned_only: bool,
) -> AppResult<Vec<Label>> {
    Ok(repo::list(db, kind, owner, assigned_only).await?)
}

/// Standalone creation; an existing entry with the same name is returned as is.
pub async fn create(
    db: &PgPool,
    kind: LabelKind,
    owner: Uuid,
    raw_name: &str,
) -> AppResult<(Label, bool)> {
    let name = clean_name(raw_name)?;
    let mut conn = db.acquire().await?;
    let (label, created) = repo::get_or_create(&mut conn, kind, owner, &name).await?;
    if created {
        info!(kind = kind.noun(), id = %label.id, owner = %owner, "label created");
    }
    Ok((label, created))
}

pub async fn update(
    db: &PgPool,
    kind: LabelKind,
    owner: Uuid,
    id: Uuid,
    raw_name: &str,
) -> AppResult<Label> {
    let name = clean_name(raw_name)?;
    repo::rename(db, kind, owner, id, &name).await
}

/// Removes the entry and its recipe links; the recipes themselves stay.
pub async fn delete(db: &PgPool, kind: LabelKind, owner: Uuid, id: Uuid) -> AppResult<()> {
    repo::delete(db, kind, owner, id).await?;
    info!(kind = kind.noun(), id = %id, owner = %owner, "label deleted");
    Ok(())
}


#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::accounts::services::{create_account, NewAccount};

    async fn user(db: &PgPool, email: &str) -> Uuid {
        let new = NewAccount {
            email: email.into(),
            password: "testpass123".into(),
            name: String::new(),
        };
        create_account(db, &new).await.unwrap().id
    }

    async fn link(db: &PgPool, owner: Uuid, kind: LabelKind, label: Uuid) {
        let recipe = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO recipes (id, user_id, title, time_minutes, price) VALUES ($1, $2, 'r', 5, 1.00)",
        )
        .bind(recipe)
        .bind(owner)
        .execute(db)
        .await
        .unwrap();
        let mut conn = db.acquire().await.unwrap();
        repo::replace_links(&mut conn, kind, recipe, &[label]).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn list_is_reverse_name_and_limited_to_owner(db: PgPool) {
        let me = user(&db, "me@example.com").await;
        let other = user(&db, "other@example.com").await;
        create(&db, LabelKind::Tag, me, "Dessert").await.unwrap();
        create(&db, LabelKind::Tag, me, "Vegan").await.unwrap();
        create(&db, LabelKind::Tag, other, "Fruity").await.unwrap();

        let names: Vec<String> = list(&db, LabelKind::Tag, me, false)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn create_twice_reuses_row(db: PgPool) {
        let me = user(&db, "me@example.com").await;
        let (first, created) = create(&db, LabelKind::Ingredient, me, "Salt").await.unwrap();
        assert!(created);
        let (again, created) = create(&db, LabelKind::Ingredient, me, " Salt ").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, again.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn assigned_only_returns_each_used_entry_once(db: PgPool) {
        let me = user(&db, "me@example.com").await;
        let (eggs, _) = create(&db, LabelKind::Ingredient, me, "Eggs").await.unwrap();
        create(&db, LabelKind::Ingredient, me, "Lentils").await.unwrap();
        link(&db, me, LabelKind::Ingredient, eggs.id).await;
        link(&db, me, LabelKind::Ingredient, eggs.id).await;

        let assigned = list(&db, LabelKind::Ingredient, me, true).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, eggs.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn other_users_entry_is_not_found(db: PgPool) {
        let me = user(&db, "me@example.com").await;
        let other = user(&db, "other@example.com").await;
        let (theirs, _) = create(&db, LabelKind::Tag, other, "Private").await.unwrap();

        let err = update(&db, LabelKind::Tag, me, theirs.id, "Mine").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        let err = delete(&db, LabelKind::Tag, me, theirs.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let still = list(&db, LabelKind::Tag, other, false).await.unwrap();
        assert_eq!(still[0].name, "Private");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn rename_to_existing_name_is_rejected(db: PgPool) {
        let me = user(&db, "me@example.com").await;
        create(&db, LabelKind::Tag, me, "Lunch").await.unwrap();
        let (dinner, _) = create(&db, LabelKind::Tag, me, "Dinner").await.unwrap();
        let err = update(&db, LabelKind::Tag, me, dinner.id, "Lunch").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

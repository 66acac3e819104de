use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_NAME_LEN: usize = 255;

/// The two per-user label tables recipes can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn table(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    /// Join table linking recipes to this kind.
    pub fn join_table(self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    /// Column in the join table that references this kind.
    pub fn join_column(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Ingredient => "ingredient",
        }
    }
}

/// Marker types so one set of handlers serves both `/tags` and `/ingredients`.
pub trait LabelTable: Send + Sync + 'static {
    const KIND: LabelKind;
}

pub struct Tags;
pub struct Ingredients;

impl LabelTable for Tags {
    const KIND: LabelKind = LabelKind::Tag;
}

impl LabelTable for Ingredients {
    const KIND: LabelKind = LabelKind::Ingredient;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Label {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub created_at: OffsetDateTime,
}

/// Trimmed, non-empty, bounded name.
pub fn clean_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name may not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Name may not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

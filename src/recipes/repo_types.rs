use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::labels::Label;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // object key, not a URL
    pub created_at: OffsetDateTime,
}

/// A recipe after its image was replaced, with the key it pointed at before.
#[derive(Debug, Clone, FromRow)]
pub struct ImageSwap {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub old_image: Option<String>,
}

/// A recipe with its tags and ingredients loaded.
#[derive(Debug, Clone)]
pub struct RecipeView {
    pub recipe: Recipe,
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
}

/// Column values for an insert or update; `None` keeps the stored value on update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
}
